//! # Location
//!
//! Opaque identifier of the place a reading is requested for.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location passed through to every source call.
///
/// The engine never interprets it; sources decide what it means.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    /// Creates a new location.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the location as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Location {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_value_through_untouched() {
        let location = Location::from("  São Paulo ");
        assert_eq!(location.as_str(), "  São Paulo ");
        assert_eq!(location.to_string(), "  São Paulo ");
    }
}
