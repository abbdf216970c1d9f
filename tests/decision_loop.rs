//! Tests that drive the decision loop over scripted scenarios.

use assert_approx_eq::assert_approx_eq;
use rsu_handover::{
    cgmath::Point2, AssociationLog, Config, CsvRecordWriter, DecisionLoop, Error, Result, Roster,
    Rsu, RsuId, ScriptedSimulator, ScriptedVehicle, Simulator, StrategyKind, VehicleId,
    RECORD_COLUMNS,
};

fn roster() -> Roster {
    Roster::new([
        Rsu::new(RsuId(1), Point2::new(0.0, 0.0)),
        Rsu::new(RsuId(2), Point2::new(200.0, 0.0)),
    ])
    .unwrap()
}

fn vehicle(id: &str, start: [f64; 2], speed: f64, despawn_tick: Option<usize>) -> ScriptedVehicle {
    ScriptedVehicle {
        id: id.into(),
        spawn_tick: 0,
        despawn_tick,
        start,
        speed,
        heading: 0.0,
        length: 5.0,
        width: 1.8,
    }
}

fn config(strategy: StrategyKind) -> Config {
    Config {
        strategy,
        tick_budget: 50,
        ..Default::default()
    }
}

/// Test that a vehicle driving past two RSUs is handed over once, at the midpoint.
#[test]
fn greedy_current_hands_over_at_midpoint() {
    let roster = roster();
    let mut sim = ScriptedSimulator::new(vec![vehicle("a", [0.0, 0.0], 20.0, Some(20))]);
    let mut log = AssociationLog::new();

    let decision_loop = DecisionLoop::new(&config(StrategyKind::GreedyCurrent), &roster).unwrap();
    let summary = decision_loop.run(&mut sim, &mut log).unwrap();

    assert!(summary.drained);
    assert_eq!(summary.ticks, 19);
    assert_eq!(summary.records, 19);
    assert!(sim.is_closed());

    let rsus = log.records().iter().map(|r| r.rsu_id.0).collect::<Vec<_>>();
    assert_eq!(&rsus[..5], &[1, 1, 1, 1, 1]);
    assert!(rsus[5..].iter().all(|id| *id == 2));
    assert_eq!(log.handovers(&VehicleId::from("a")), 1);
    assert_approx_eq!(log.records()[0].signal_strength, 1.0 / 21.0);
}

/// Test that the run stops at the tick budget when vehicles remain.
#[test]
fn respects_tick_budget() {
    let roster = roster();
    let mut sim = ScriptedSimulator::new(vec![vehicle("a", [0.0, 0.0], 1.0, None)]);
    let mut log = AssociationLog::new();
    let config = Config {
        tick_budget: 7,
        ..config(StrategyKind::GreedyLookahead)
    };

    let summary = DecisionLoop::new(&config, &roster)
        .unwrap()
        .run(&mut sim, &mut log)
        .unwrap();
    assert!(!summary.drained);
    assert_eq!(summary.ticks, 7);
    assert_eq!(sim.time(), 7);
    assert_eq!(log.len(), 7);
    assert!(log.records().iter().all(|r| r.score.is_some()));
}

/// Test that records within a tick are ordered by vehicle ID.
#[test]
fn records_sorted_by_vehicle() {
    let roster = roster();
    let mut sim = ScriptedSimulator::new(vec![
        vehicle("c", [0.0, 30.0], 5.0, Some(3)),
        vehicle("a", [0.0, 10.0], 5.0, Some(3)),
        vehicle("b", [0.0, -10.0], 5.0, Some(3)),
    ]);
    let mut log = AssociationLog::new();
    DecisionLoop::new(&config(StrategyKind::GreedyCurrent), &roster)
        .unwrap()
        .run(&mut sim, &mut log)
        .unwrap();

    for tick in 0..2 {
        let ids = log
            .at_tick(tick)
            .map(|r| r.vehicle_id.0.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}

/// Test that a vehicle with invalid kinematics is skipped without aborting the run.
#[test]
fn invalid_vehicle_is_skipped() {
    let roster = roster();
    let mut sim = ScriptedSimulator::new(vec![
        vehicle("good", [0.0, 0.0], 10.0, Some(4)),
        vehicle("bad", [50.0, 0.0], -3.0, Some(4)),
    ]);
    let mut log = AssociationLog::new();

    let summary = DecisionLoop::new(&config(StrategyKind::GreedyLookahead), &roster)
        .unwrap()
        .run(&mut sim, &mut log)
        .unwrap();
    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.records, 3);
    assert!(log.records().iter().all(|r| r.vehicle_id.0 == "good"));
}

/// Test that horizon-optimal decides for every vehicle when RSUs are in range.
#[test]
fn horizon_optimal_run() {
    let roster = roster();
    let mut sim = ScriptedSimulator::new(vec![
        vehicle("a", [0.0, 5.0], 10.0, Some(15)),
        vehicle("b", [200.0, -5.0], 0.0, Some(15)),
    ]);
    let mut log = AssociationLog::new();

    let summary = DecisionLoop::new(&config(StrategyKind::HorizonOptimal), &roster)
        .unwrap()
        .run(&mut sim, &mut log)
        .unwrap();
    assert_eq!(summary.ticks, 14);
    assert_eq!(summary.records, 28);
    assert_eq!(summary.undecided, 0);
    for record in log.records() {
        assert!(record.score.unwrap() > 0.0);
        assert!(record.signal_strength > 0.0 && record.signal_strength <= 1.0);
    }
    assert_eq!(log.get(0, &"a".into()).unwrap().rsu_id, RsuId(1));
    assert_eq!(log.get(0, &"b".into()).unwrap().rsu_id, RsuId(2));
    assert!(log.served_vehicles(RsuId(2)).contains(&&VehicleId::from("b")));
}

/// Test that only the header is written when no RSU is reachable.
#[test]
fn empty_roster_writes_header_only() {
    let roster = Roster::new(std::iter::empty()).unwrap();
    let mut sim = ScriptedSimulator::new(vec![vehicle("a", [0.0, 0.0], 10.0, Some(3))]);
    let mut writer = CsvRecordWriter::new(vec![]);

    let summary = DecisionLoop::new(&config(StrategyKind::GreedyCurrent), &roster)
        .unwrap()
        .run(&mut sim, &mut writer)
        .unwrap();
    assert_eq!(summary.undecided, 2);
    let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    assert_eq!(output, format!("{}\n", RECORD_COLUMNS.join(",")));
}

/// A simulator whose session fails after a fixed number of ticks.
struct FailingSimulator {
    inner: ScriptedSimulator,
    fail_at: usize,
    closes: usize,
}

impl Simulator for FailingSimulator {
    fn advance_tick(&mut self) -> Result<()> {
        if self.inner.time() == self.fail_at {
            return Err(Error::SimulatorUnavailable("connection reset".into()));
        }
        self.inner.advance_tick()
    }

    fn active_vehicle_ids(&self) -> Result<Vec<VehicleId>> {
        self.inner.active_vehicle_ids()
    }

    fn position(&self, id: &VehicleId) -> Result<rsu_handover::math::Point2d> {
        self.inner.position(id)
    }

    fn speed(&self, id: &VehicleId) -> Result<f64> {
        self.inner.speed(id)
    }

    fn heading(&self, id: &VehicleId) -> Result<f64> {
        self.inner.heading(id)
    }

    fn length(&self, id: &VehicleId) -> Result<f64> {
        self.inner.length(id)
    }

    fn width(&self, id: &VehicleId) -> Result<f64> {
        self.inner.width(id)
    }

    fn close(&mut self) -> Result<()> {
        self.closes += 1;
        self.inner.close()
    }
}

/// Test that a simulator failure aborts the run, keeps the records emitted
/// so far and still closes the session.
#[test]
fn simulator_failure_closes_session() {
    let roster = roster();
    let mut sim = FailingSimulator {
        inner: ScriptedSimulator::new(vec![vehicle("a", [0.0, 0.0], 10.0, None)]),
        fail_at: 4,
        closes: 0,
    };
    let mut log = AssociationLog::new();

    let result = DecisionLoop::new(&config(StrategyKind::GreedyCurrent), &roster)
        .unwrap()
        .run(&mut sim, &mut log);
    assert!(matches!(result, Err(Error::SimulatorUnavailable(_))));
    assert_eq!(sim.closes, 1);
    assert_eq!(log.len(), 4);
}

/// Test that an invalid configuration is rejected before the run starts.
#[test]
fn rejects_invalid_config() {
    let roster = roster();
    let config = Config {
        horizon: 0,
        ..config(StrategyKind::HorizonOptimal)
    };
    assert!(matches!(
        DecisionLoop::new(&config, &roster),
        Err(Error::InvalidConfig(_))
    ));
}
