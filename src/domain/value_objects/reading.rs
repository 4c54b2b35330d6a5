//! # Reading
//!
//! A single temperature reading reported by one source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer temperature reading.
///
/// # Examples
///
/// ```
/// use weather_aggregator::domain::value_objects::reading::Reading;
///
/// let readings = [Reading::new(20), Reading::new(30)];
/// assert_eq!(Reading::mean(&readings), 25.0);
/// assert_eq!(Reading::mean(&[]), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reading(i32);

impl Reading {
    /// Creates a new reading.
    #[inline]
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Arithmetic mean of the given readings, `0.0` when there are none.
    ///
    /// The sum is accumulated in `i64` and divided once, so integer inputs
    /// produce the exact rational result whenever it is representable.
    #[must_use]
    pub fn mean<'a, I>(readings: I) -> f64
    where
        I: IntoIterator<Item = &'a Reading>,
    {
        let (sum, count) = readings
            .into_iter()
            .fold((0i64, 0u64), |(sum, count), r| (sum + i64::from(r.0), count + 1));
        if count == 0 {
            return 0.0;
        }
        sum as f64 / count as f64
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Reading {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_zero() {
        let avg = Reading::mean(&[]);
        assert_eq!(avg, 0.0);
        assert!(!avg.is_nan());
    }

    #[test]
    fn mean_is_exact_for_integers() {
        let readings = [Reading::new(20), Reading::new(22), Reading::new(24)];
        assert_eq!(Reading::mean(&readings), 22.0);
    }

    #[test]
    fn mean_handles_negative_and_extreme_values() {
        let readings = [Reading::new(i32::MAX), Reading::new(i32::MAX), Reading::new(-10)];
        let expected = (2.0 * f64::from(i32::MAX) - 10.0) / 3.0;
        assert_eq!(Reading::mean(&readings), expected);
    }
}
