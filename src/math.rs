//! Mathematical structs and functions.

use cgmath::{Point2, Vector2};

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;

/// A unit vector pointing along `heading`, given in radians
/// counter-clockwise from the positive x-axis.
pub fn heading_vector(heading: f64) -> Vector2d {
    Vector2d::new(heading.cos(), heading.sin())
}

/// Checks that every coordinate of the point is finite.
pub fn is_finite_point(point: Point2d) -> bool {
    point.x.is_finite() && point.y.is_finite()
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn heading_axes() {
        let east = heading_vector(0.0);
        assert_approx_eq!(east.x, 1.0);
        assert_approx_eq!(east.y, 0.0);
        let north = heading_vector(FRAC_PI_2);
        assert_approx_eq!(north.x, 0.0);
        assert_approx_eq!(north.y, 1.0);
    }
}
