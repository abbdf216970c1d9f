use crate::math::Point2d;
use crate::util::Interval;
use cgmath::MetricSpace;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Another vehicle which may stand between a subject vehicle and an RSU,
/// resolved to the tick being evaluated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    /// The world space position of the obstacle's centre.
    pub position: Point2d,
    /// The obstacle's length, if known.
    pub length: Option<f64>,
    /// The obstacle's width, if known.
    pub width: Option<f64>,
}

/// How line of sight obstruction is decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObstructionPolicy {
    /// Blocked if the obstacle lies in the axis-aligned rectangle
    /// spanned by the subject and the RSU.
    BoundingRegion,
    /// As [BoundingRegion](Self::BoundingRegion), with the rectangle grown
    /// by half the obstacle's effective size on every side.
    ExpandedBoundingRegion,
    /// Blocked if the obstacle is closer to the subject than the RSU is,
    /// and closer than half the obstacle's effective size.
    SegmentProximity,
}

impl Obstacle {
    /// Creates an obstacle without physical extents.
    pub fn point(position: Point2d) -> Self {
        Self {
            position,
            length: None,
            width: None,
        }
    }

    /// The larger of the obstacle's length and width, or zero if neither is known.
    pub fn effective_size(&self) -> f64 {
        let length = self.length.unwrap_or(0.0);
        let width = self.width.unwrap_or(0.0);
        f64::max(length, width).max(0.0)
    }
}

impl ObstructionPolicy {
    /// Determines whether `obstacle` blocks the line of sight between
    /// `subject` and `rsu`.
    pub fn is_blocked(&self, subject: Point2d, rsu: Point2d, obstacle: &Obstacle) -> bool {
        match self {
            ObstructionPolicy::BoundingRegion => in_region(subject, rsu, obstacle.position, 0.0),
            ObstructionPolicy::ExpandedBoundingRegion => in_region(
                subject,
                rsu,
                obstacle.position,
                0.5 * obstacle.effective_size(),
            ),
            ObstructionPolicy::SegmentProximity => {
                let to_rsu = subject.distance(rsu);
                let to_obstacle = subject.distance(obstacle.position);
                to_obstacle < to_rsu && to_obstacle < 0.5 * obstacle.effective_size()
            }
        }
    }

    /// Determines whether any of the obstacles blocks the line of sight.
    pub fn any_blocked(
        &self,
        subject: Point2d,
        rsu: Point2d,
        obstacles: impl IntoIterator<Item = impl Borrow<Obstacle>>,
    ) -> bool {
        obstacles
            .into_iter()
            .any(|obstacle| self.is_blocked(subject, rsu, obstacle.borrow()))
    }
}

fn in_region(a: Point2d, b: Point2d, point: Point2d, margin: f64) -> bool {
    let xs = Interval::spanning(a.x, b.x).expand(margin);
    let ys = Interval::spanning(a.y, b.y).expand(margin);
    xs.contains(point.x) && ys.contains(point.y)
}
