//! The boundary with the external vehicle-motion simulator.

use crate::error::{Error, Result};
use crate::math::{heading_vector, Point2d};
use crate::obstacle::Obstacle;
use crate::trajectory::Kinematics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Unique ID of a vehicle, as reported by the simulator.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(id: &str) -> Self {
        VehicleId(id.to_owned())
    }
}

/// A read-only oracle over the simulator's state at the current tick.
///
/// Every query answers for the tick most recently reached by
/// [advance_tick](Self::advance_tick). The decision loop never mutates
/// simulated state through this interface.
pub trait Simulator {
    /// Advances the simulation by one tick.
    fn advance_tick(&mut self) -> Result<()>;

    /// The vehicles present at the current tick.
    fn active_vehicle_ids(&self) -> Result<Vec<VehicleId>>;

    /// The world space position of a vehicle.
    fn position(&self, id: &VehicleId) -> Result<Point2d>;

    /// The speed of a vehicle in distance units per tick.
    fn speed(&self, id: &VehicleId) -> Result<f64>;

    /// The heading of a vehicle in degrees, counter-clockwise from the positive x-axis.
    fn heading(&self, id: &VehicleId) -> Result<f64>;

    /// The length of a vehicle.
    fn length(&self, id: &VehicleId) -> Result<f64>;

    /// The width of a vehicle.
    fn width(&self, id: &VehicleId) -> Result<f64>;

    /// Releases the simulator session. Called exactly once when a run ends,
    /// whether or not it succeeded.
    fn close(&mut self) -> Result<()>;
}

/// The state of one vehicle, valid only for the tick it was captured at.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub position: Point2d,
    /// Speed in distance units per tick.
    pub speed: f64,
    /// Heading in degrees.
    pub heading: f64,
    pub length: f64,
    pub width: f64,
}

impl VehicleSnapshot {
    /// Queries the simulator for the state of a single vehicle.
    pub fn capture(sim: &impl Simulator, id: &VehicleId) -> Result<Self> {
        Ok(Self {
            id: id.clone(),
            position: sim.position(id)?,
            speed: sim.speed(id)?,
            heading: sim.heading(id)?,
            length: sim.length(id)?,
            width: sim.width(id)?,
        })
    }

    /// Validates the snapshot and converts it into kinematics with the heading in radians.
    /// Headings outside `[-360, 360]` degrees are rejected.
    pub fn kinematics(&self) -> Result<Kinematics> {
        if !(-360.0..=360.0).contains(&self.heading) {
            return Err(Error::invalid_kinematics(format!(
                "heading {} is outside [-360, 360] degrees",
                self.heading
            )));
        }
        Kinematics::new(self.position, self.speed, self.heading.to_radians())
    }

    /// This vehicle viewed as an obstacle at its current position.
    pub fn as_obstacle(&self) -> Obstacle {
        Obstacle {
            position: self.position,
            length: Some(self.length).filter(|len| len.is_finite()),
            width: Some(self.width).filter(|wid| wid.is_finite()),
        }
    }
}

/// Every active vehicle at one tick.
#[derive(Clone, Debug, Default)]
pub struct TickSnapshot {
    /// The zero-based index of the tick.
    pub tick: usize,
    pub vehicles: Vec<VehicleSnapshot>,
}

impl TickSnapshot {
    /// Captures the state of every active vehicle, ordered by vehicle ID.
    pub fn capture(sim: &impl Simulator, tick: usize) -> Result<Self> {
        let mut ids = sim.active_vehicle_ids()?;
        ids.sort();
        let vehicles = ids
            .iter()
            .map(|id| VehicleSnapshot::capture(sim, id))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { tick, vehicles })
    }

    /// Whether no vehicles were active.
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

/// A vehicle in a [ScriptedSimulator] scenario, moving at constant velocity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScriptedVehicle {
    pub id: VehicleId,
    /// The first tick at which the vehicle is present.
    #[serde(default)]
    pub spawn_tick: usize,
    /// The first tick at which the vehicle has left, if it ever does.
    #[serde(default)]
    pub despawn_tick: Option<usize>,
    /// Position at the spawn tick.
    pub start: [f64; 2],
    /// Speed in distance units per tick.
    pub speed: f64,
    /// Heading in degrees.
    pub heading: f64,
    #[serde(default = "default_length")]
    pub length: f64,
    #[serde(default = "default_width")]
    pub width: f64,
}

fn default_length() -> f64 {
    5.0
}

fn default_width() -> f64 {
    1.8
}

/// A self-contained [Simulator] which replays a fixed scenario of
/// constant-velocity vehicles. Stands in for an external traffic simulator.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSimulator {
    vehicles: Vec<ScriptedVehicle>,
    /// The number of ticks advanced so far.
    time: usize,
    closed: bool,
}

impl ScriptedSimulator {
    /// Creates a simulator replaying the given vehicles.
    pub fn new(vehicles: Vec<ScriptedVehicle>) -> Self {
        Self {
            vehicles,
            time: 0,
            closed: false,
        }
    }

    /// Loads a scenario from a JSON array of [ScriptedVehicle]s.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read(path.as_ref())?;
        let vehicles: Vec<ScriptedVehicle> = serde_json::from_slice(&content)?;
        log::info!(
            "Loaded scenario with {} vehicles from {}",
            vehicles.len(),
            path.as_ref().display()
        );
        Ok(Self::new(vehicles))
    }

    /// The number of ticks advanced so far.
    pub fn time(&self) -> usize {
        self.time
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn is_active(&self, vehicle: &ScriptedVehicle) -> bool {
        vehicle.spawn_tick <= self.time && vehicle.despawn_tick.map_or(true, |t| self.time < t)
    }

    fn vehicle(&self, id: &VehicleId) -> Result<&ScriptedVehicle> {
        if self.closed {
            return Err(Error::SimulatorUnavailable("session is closed".into()));
        }
        self.vehicles
            .iter()
            .find(|vehicle| vehicle.id == *id && self.is_active(vehicle))
            .ok_or_else(|| Error::SimulatorUnavailable(format!("unknown vehicle {}", id)))
    }
}

impl Simulator for ScriptedSimulator {
    fn advance_tick(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::SimulatorUnavailable("session is closed".into()));
        }
        self.time += 1;
        Ok(())
    }

    fn active_vehicle_ids(&self) -> Result<Vec<VehicleId>> {
        if self.closed {
            return Err(Error::SimulatorUnavailable("session is closed".into()));
        }
        Ok(self
            .vehicles
            .iter()
            .filter(|vehicle| self.is_active(vehicle))
            .map(|vehicle| vehicle.id.clone())
            .collect())
    }

    fn position(&self, id: &VehicleId) -> Result<Point2d> {
        let vehicle = self.vehicle(id)?;
        let elapsed = (self.time - vehicle.spawn_tick) as f64;
        let start = Point2d::new(vehicle.start[0], vehicle.start[1]);
        Ok(start + vehicle.speed * elapsed * heading_vector(vehicle.heading.to_radians()))
    }

    fn speed(&self, id: &VehicleId) -> Result<f64> {
        Ok(self.vehicle(id)?.speed)
    }

    fn heading(&self, id: &VehicleId) -> Result<f64> {
        Ok(self.vehicle(id)?.heading)
    }

    fn length(&self, id: &VehicleId) -> Result<f64> {
        Ok(self.vehicle(id)?.length)
    }

    fn width(&self, id: &VehicleId) -> Result<f64> {
        Ok(self.vehicle(id)?.width)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
