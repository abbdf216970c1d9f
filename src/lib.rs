//! Predictive roadside-unit (RSU) selection for vehicles moving through a
//! simulated road network.
//!
//! Each tick, every active vehicle is associated with one RSU from a fixed
//! [Roster], chosen by a [SelectionStrategy]: the strongest current link, the
//! best predicted `strength × duration`, or the first step of an optimal
//! handover [Schedule] over a short horizon.

pub use cgmath;
pub use config::{Config, StrategyKind, DEFAULT_TICK_BUDGET};
pub use decision_loop::{DecisionLoop, RunSummary};
pub use duration::{
    naive_eta, ConnectionDurationEstimator, DurationModel, DEFAULT_MAX_DURATION,
    DEFAULT_RANGE_THRESHOLD, DEFAULT_STEP_SIZE,
};
pub use error::{Error, Result};
pub use link_quality::{
    strength, LinkQuality, LinkQualityModel, SOFT_BLOCK_PENALTY, STRONG_BLOCK_PENALTY,
};
pub use obstacle::{Obstacle, ObstructionPolicy};
pub use records::{
    AssociationLog, ConnectionRecord, CsvRecordWriter, RecordSink, RECORD_COLUMNS,
};
pub use roster::{Roster, Rsu, RsuId};
pub use scene::Scene;
pub use scheduler::{
    HorizonOptimalScheduler, NodeId, NodeKind, Schedule, ScheduleEdge, TimeExpandedGraph,
    TimeExpandedNode, DEFAULT_HORIZON,
};
pub use simulator::{
    ScriptedSimulator, ScriptedVehicle, Simulator, TickSnapshot, VehicleId, VehicleSnapshot,
};
pub use strategy::{
    Decision, DecisionContext, GreedyCurrent, GreedyLookahead, HorizonOptimal, SelectionStrategy,
    DEFAULT_LOOKAHEAD,
};
pub use trajectory::{predict, Kinematics};
pub use util::Interval;

mod config;
mod decision_loop;
mod duration;
mod error;
mod link_quality;
pub mod math;
mod obstacle;
mod records;
mod roster;
mod scene;
mod scheduler;
mod simulator;
mod strategy;
mod trajectory;
mod util;
