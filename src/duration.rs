use crate::error::Result;
use crate::obstacle::ObstructionPolicy;
use crate::roster::Rsu;
use crate::scene::Scene;
use crate::simulator::VehicleId;
use crate::trajectory::Kinematics;
use cgmath::MetricSpace;
use serde::{Deserialize, Serialize};

/// Default maximum rollout length, in ticks.
pub const DEFAULT_MAX_DURATION: u32 = 10;

/// Default rollout step, in ticks.
pub const DEFAULT_STEP_SIZE: u32 = 1;

/// Default communication range, in distance units.
pub const DEFAULT_RANGE_THRESHOLD: f64 = 400.0;

/// How the expected connection duration to an RSU is estimated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationModel {
    /// Roll the trajectory forward until the RSU leaves range or is obstructed.
    #[default]
    Rollout,
    /// Current distance divided by current speed. A time-to-close-the-gap
    /// heuristic rather than a measure of connection viability.
    NaiveEta,
}

/// Estimates how many future ticks a vehicle would stay connected to an RSU.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectionDurationEstimator {
    pub model: DurationModel,
    /// The longest rollout considered, in ticks.
    pub max_duration: u32,
    /// The spacing of rollout samples, in ticks.
    pub step_size: u32,
    /// Distance beyond which the RSU is out of range.
    pub range_threshold: f64,
    /// Obstruction test applied at each rollout tick, if any.
    pub obstruction: Option<ObstructionPolicy>,
}

impl Default for ConnectionDurationEstimator {
    fn default() -> Self {
        Self {
            model: DurationModel::Rollout,
            max_duration: DEFAULT_MAX_DURATION,
            step_size: DEFAULT_STEP_SIZE,
            range_threshold: DEFAULT_RANGE_THRESHOLD,
            obstruction: Some(ObstructionPolicy::BoundingRegion),
        }
    }
}

impl ConnectionDurationEstimator {
    /// Estimates the connection duration of `subject` to `rsu` with the configured model.
    pub fn estimate(
        &self,
        kin: &Kinematics,
        rsu: &Rsu,
        scene: &Scene,
        subject: &VehicleId,
    ) -> Result<f64> {
        match self.model {
            DurationModel::Rollout => self.rollout(kin, rsu, scene, subject).map(f64::from),
            DurationModel::NaiveEta => Ok(naive_eta(kin, rsu)),
        }
    }

    /// Counts the ticks, in steps of `step_size` up to `max_duration`, for which
    /// the predicted position stays within range and unobstructed.
    /// Stops at the first tick that fails either test.
    pub fn rollout(
        &self,
        kin: &Kinematics,
        rsu: &Rsu,
        scene: &Scene,
        subject: &VehicleId,
    ) -> Result<u32> {
        let step = self.step_size.max(1);
        let mut duration = 0;
        for t in (1..=self.max_duration).step_by(step as usize) {
            let pos = kin.predict(f64::from(t))?;
            if pos.distance(rsu.position()) > self.range_threshold {
                break;
            }
            if let Some(policy) = self.obstruction {
                let obstacles = scene.obstacles_at(f64::from(t), subject);
                if policy.any_blocked(pos, rsu.position(), obstacles) {
                    break;
                }
            }
            duration += step;
        }
        Ok(duration.min(self.max_duration))
    }
}

/// The time, in ticks, to cover the current distance to the RSU at the current speed.
/// Infinite for a stationary vehicle.
pub fn naive_eta(kin: &Kinematics, rsu: &Rsu) -> f64 {
    let distance = kin.position.distance(rsu.position());
    if kin.speed == 0.0 {
        f64::INFINITY
    } else {
        distance / kin.speed
    }
}
