use crate::math::Point2d;
use crate::obstacle::{Obstacle, ObstructionPolicy};
use cgmath::MetricSpace;
use std::borrow::Borrow;

/// Strong obstruction penalty, paired with the bounding-region policies
/// where any obstacle in the region is assumed to fully block the path.
pub const STRONG_BLOCK_PENALTY: f64 = 5.0;

/// Soft obstruction penalty, for when an obstacle only partially degrades
/// an otherwise direct path.
pub const SOFT_BLOCK_PENALTY: f64 = 1.5;

/// The predicted quality of a link between a vehicle and an RSU.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkQuality {
    /// Straight line distance between the vehicle and the RSU.
    pub distance: f64,
    /// Whether the line of sight is obstructed.
    pub obstructed: bool,
    /// Signal strength in `[0, 1]`.
    pub strength: f64,
}

/// Converts a distance and obstruction state into a signal strength in `[0, 1]`.
///
/// An obstructed link behaves like an unobstructed one over a distance
/// `block_penalty` times longer. Co-located endpoints always have strength 1.
pub fn strength(distance: f64, blocked: bool, block_penalty: f64) -> f64 {
    if distance == 0.0 {
        return 1.0;
    }
    let effective = if blocked {
        distance * block_penalty
    } else {
        distance
    };
    f64::max(0.0, 1.0 / (1.0 + effective))
}

/// The link quality model: an obstruction policy paired with the penalty
/// applied to obstructed links.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkQualityModel {
    /// How obstruction is detected.
    pub policy: ObstructionPolicy,
    /// Multiplier applied to the distance of an obstructed link; at least 1.
    pub block_penalty: f64,
}

impl LinkQualityModel {
    /// Evaluates the link between `subject` and `rsu`, given the obstacles
    /// resolved to the same tick as `subject`.
    pub fn evaluate(
        &self,
        subject: Point2d,
        rsu: Point2d,
        obstacles: impl IntoIterator<Item = impl Borrow<Obstacle>>,
    ) -> LinkQuality {
        let distance = subject.distance(rsu);
        let obstructed = self.policy.any_blocked(subject, rsu, obstacles);
        LinkQuality {
            distance,
            obstructed,
            strength: strength(distance, obstructed, self.block_penalty),
        }
    }
}

impl Default for LinkQualityModel {
    fn default() -> Self {
        Self {
            policy: ObstructionPolicy::BoundingRegion,
            block_penalty: STRONG_BLOCK_PENALTY,
        }
    }
}
