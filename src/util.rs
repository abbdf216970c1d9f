//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

use cgmath::num_traits::Float;
use serde::{Deserialize, Serialize};

/// A closed interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T> Interval<T> {
    /// Creates a new interval.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: std::cmp::PartialOrd + Copy> Interval<T> {
    /// Creates the smallest interval containing both values, in either order.
    pub fn spanning(a: T, b: T) -> Self {
        if a <= b {
            Self::new(a, b)
        } else {
            Self::new(b, a)
        }
    }

    /// Returns true if this interval contains the value.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

impl<T: Float> Interval<T> {
    /// Grows the interval by `margin` on both ends.
    pub fn expand(&self, margin: T) -> Self {
        Self {
            min: self.min - margin,
            max: self.max + margin,
        }
    }
}

impl<T: Debug> Debug for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spanning_is_order_independent() {
        assert_eq!(Interval::spanning(3.0, -1.0), Interval::spanning(-1.0, 3.0));
        assert!(Interval::spanning(3.0, -1.0).contains(-1.0));
        assert!(Interval::spanning(3.0, -1.0).contains(3.0));
        assert!(!Interval::spanning(3.0, -1.0).contains(3.5));
    }

    #[test]
    fn expand() {
        let interval = Interval::new(0.0, 1.0).expand(2.0);
        assert_eq!(interval, Interval::new(-2.0, 3.0));
    }
}
