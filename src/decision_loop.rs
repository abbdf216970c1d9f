use crate::config::Config;
use crate::error::Result;
use crate::records::{ConnectionRecord, RecordSink};
use crate::roster::Roster;
use crate::scene::Scene;
use crate::simulator::{Simulator, TickSnapshot, VehicleSnapshot};
use crate::strategy::{Decision, DecisionContext, SelectionStrategy};
use rayon::prelude::*;

/// Counters describing a completed run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// The number of ticks processed.
    pub ticks: usize,
    /// The number of records emitted.
    pub records: usize,
    /// Vehicle-ticks skipped because of invalid kinematics.
    pub skipped: usize,
    /// Vehicle-ticks for which no RSU was chosen.
    pub undecided: usize,
    /// Whether the run ended because no vehicles remained.
    pub drained: bool,
}

/// The outcome of deciding for one vehicle.
enum Outcome {
    Decided(ConnectionRecord),
    Undecided,
    Skipped,
}

/// Runs one decision epoch per simulated tick until the simulator has no
/// active vehicles or the tick budget is exhausted.
pub struct DecisionLoop<'a> {
    roster: &'a Roster,
    strategy: Box<dyn SelectionStrategy>,
    tick_budget: usize,
}

impl<'a> DecisionLoop<'a> {
    /// Creates a decision loop using the configured strategy.
    pub fn new(config: &Config, roster: &'a Roster) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_strategy(
            config.build_strategy(),
            roster,
            config.tick_budget,
        ))
    }

    /// Creates a decision loop with an explicit strategy.
    pub fn with_strategy(
        strategy: Box<dyn SelectionStrategy>,
        roster: &'a Roster,
        tick_budget: usize,
    ) -> Self {
        Self {
            roster,
            strategy,
            tick_budget,
        }
    }

    /// The strategy in use.
    pub fn strategy(&self) -> &dyn SelectionStrategy {
        self.strategy.as_ref()
    }

    /// Drives the simulator to completion, emitting the records of each tick
    /// to `sink`. The simulator session is closed whether or not the run succeeds.
    pub fn run(&self, sim: &mut impl Simulator, sink: &mut impl RecordSink) -> Result<RunSummary> {
        log::info!(
            "Starting {} run over {} RSUs with a budget of {} ticks",
            self.strategy.name(),
            self.roster.len(),
            self.tick_budget
        );
        let result = self.run_ticks(sim, sink).and_then(|summary| {
            sink.finish()?;
            Ok(summary)
        });
        let closed = sim.close();

        match (result, closed) {
            (Ok(summary), Ok(())) => {
                log::info!(
                    "Run finished after {} ticks with {} records ({} skipped, {} undecided)",
                    summary.ticks,
                    summary.records,
                    summary.skipped,
                    summary.undecided
                );
                Ok(summary)
            }
            (Ok(_), Err(err)) => Err(err),
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    log::warn!("Failed to close simulator session: {}", close_err);
                }
                log::error!("Run aborted: {}", err);
                Err(err)
            }
        }
    }

    fn run_ticks(
        &self,
        sim: &mut impl Simulator,
        sink: &mut impl RecordSink,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for tick in 0..self.tick_budget {
            sim.advance_tick()?;
            let snapshot = TickSnapshot::capture(sim, tick)?;
            if snapshot.is_empty() {
                log::info!("No active vehicles remain at tick {}", tick);
                summary.drained = true;
                break;
            }

            let records = self.decide_tick(&snapshot, &mut summary)?;
            sink.emit(tick, &records)?;
            summary.records += records.len();
            summary.ticks += 1;
        }
        Ok(summary)
    }

    /// Decides for every vehicle of one tick. Vehicles are independent and
    /// are evaluated in parallel.
    pub fn decide_tick(
        &self,
        snapshot: &TickSnapshot,
        summary: &mut RunSummary,
    ) -> Result<Vec<ConnectionRecord>> {
        let scene = Scene::new(snapshot);
        let outcomes = snapshot
            .vehicles
            .par_iter()
            .map(|vehicle| self.decide_vehicle(&scene, vehicle))
            .collect::<Result<Vec<_>>>()?;

        let mut records = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Outcome::Decided(record) => records.push(record),
                Outcome::Undecided => summary.undecided += 1,
                Outcome::Skipped => summary.skipped += 1,
            }
        }
        Ok(records)
    }

    fn decide_vehicle(&self, scene: &Scene, vehicle: &VehicleSnapshot) -> Result<Outcome> {
        let ctx = DecisionContext {
            roster: self.roster,
            scene,
            vehicle,
        };
        match self.strategy.select(&ctx) {
            Ok(Some(decision)) => {
                log::debug!(
                    "Vehicle {} connected to RSU {} with signal {}",
                    vehicle.id,
                    decision.rsu,
                    decision.strength
                );
                Ok(Outcome::Decided(record(scene.tick(), vehicle, decision)))
            }
            Ok(None) => {
                log::debug!("No candidate RSU for vehicle {}", vehicle.id);
                Ok(Outcome::Undecided)
            }
            Err(err) if !err.is_fatal() => {
                log::warn!("Skipping vehicle {} at tick {}: {}", vehicle.id, scene.tick(), err);
                Ok(Outcome::Skipped)
            }
            Err(err) => Err(err),
        }
    }
}

fn record(tick: usize, vehicle: &VehicleSnapshot, decision: Decision) -> ConnectionRecord {
    ConnectionRecord {
        tick,
        vehicle_id: vehicle.id.clone(),
        rsu_id: decision.rsu,
        signal_strength: decision.strength,
        estimated_duration: decision.duration,
        score: decision.score,
    }
}
