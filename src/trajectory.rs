use crate::error::{Error, Result};
use crate::math::{heading_vector, is_finite_point, Point2d};

/// The kinematic state of a vehicle at the tick it was observed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Kinematics {
    /// World space position of the vehicle.
    pub position: Point2d,
    /// Speed in distance units per tick.
    pub speed: f64,
    /// Heading in radians, counter-clockwise from the positive x-axis.
    pub heading: f64,
}

impl Kinematics {
    /// Creates a validated kinematic state.
    pub fn new(position: Point2d, speed: f64, heading: f64) -> Result<Self> {
        let kinematics = Self {
            position,
            speed,
            heading,
        };
        kinematics.validate()?;
        Ok(kinematics)
    }

    /// Rejects NaN/infinite values and negative speeds.
    pub fn validate(&self) -> Result<()> {
        if !is_finite_point(self.position) {
            return Err(Error::invalid_kinematics(format!(
                "non-finite position ({}, {})",
                self.position.x, self.position.y
            )));
        }
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(Error::invalid_kinematics(format!(
                "speed must be finite and non-negative, got {}",
                self.speed
            )));
        }
        if !self.heading.is_finite() {
            return Err(Error::invalid_kinematics(format!(
                "non-finite heading {}",
                self.heading
            )));
        }
        Ok(())
    }

    /// Projects the vehicle's position `ticks_ahead` ticks into the future.
    pub fn predict(&self, ticks_ahead: f64) -> Result<Point2d> {
        predict(self.position, self.speed, self.heading, ticks_ahead)
    }
}

/// Predicts a future position assuming constant speed and heading.
///
/// # Parameters
/// * `position` - The current position
/// * `speed` - The speed in distance units per tick
/// * `heading` - The heading in radians
/// * `ticks_ahead` - How many ticks into the future to project
pub fn predict(position: Point2d, speed: f64, heading: f64, ticks_ahead: f64) -> Result<Point2d> {
    Kinematics {
        position,
        speed,
        heading,
    }
    .validate()?;
    if !ticks_ahead.is_finite() || ticks_ahead < 0.0 {
        return Err(Error::invalid_kinematics(format!(
            "ticks ahead must be finite and non-negative, got {}",
            ticks_ahead
        )));
    }
    Ok(position + speed * ticks_ahead * heading_vector(heading))
}
