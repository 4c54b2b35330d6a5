//! # Weather Report
//!
//! Terminal value of one aggregation request.
//!
//! A [`WeatherReport`] is built once from the settled outcomes of every
//! source and never changes afterwards. Construction validates that the
//! success map, the failure list and the fastest-source marker agree.
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeMap;
//! use weather_aggregator::domain::entities::weather_report::WeatherReport;
//! use weather_aggregator::domain::value_objects::{Reading, SourceName};
//!
//! let mut readings = BTreeMap::new();
//! readings.insert(SourceName::new("API1"), Reading::new(20));
//! readings.insert(SourceName::new("API3"), Reading::new(30));
//!
//! let report = WeatherReport::new(
//!     readings,
//!     vec![SourceName::new("API2")],
//!     Some(SourceName::new("API1")),
//! )
//! .unwrap();
//!
//! assert_eq!(report.average_temperature(), 25.0);
//! assert_eq!(report.fastest_source(), "API1");
//! ```

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{Reading, SourceName};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Sentinel reported when no source succeeded before the race resolved.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Aggregated readings of one request.
///
/// # Invariants
///
/// - Keys of [`source_temperatures`](Self::source_temperatures) and entries of
///   [`failed_sources`](Self::failed_sources) are disjoint, and the failure
///   list has no duplicates.
/// - The fastest source, when present, is a key of the success map; it is
///   absent (reported as `"Unknown"`) whenever the success map is empty.
/// - `average_temperature` is the mean of the successful readings, `0.0`
///   when there are none.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    average_temperature: f64,
    source_temperatures: BTreeMap<SourceName, Reading>,
    failed_sources: Vec<SourceName>,
    fastest_source: Option<SourceName>,
}

impl WeatherReport {
    /// Creates a report, computing the average from the successful readings.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InconsistentReport` if a source is both read and
    /// failed, a failed source is listed twice, or the fastest source is not
    /// among the successful ones.
    pub fn new(
        source_temperatures: BTreeMap<SourceName, Reading>,
        failed_sources: Vec<SourceName>,
        fastest_source: Option<SourceName>,
    ) -> DomainResult<Self> {
        let mut seen = HashSet::with_capacity(failed_sources.len());
        for failed in &failed_sources {
            if source_temperatures.contains_key(failed) {
                return Err(DomainError::inconsistent_report(format!(
                    "{failed} is listed as both successful and failed"
                )));
            }
            if !seen.insert(failed) {
                return Err(DomainError::inconsistent_report(format!(
                    "{failed} is listed as failed more than once"
                )));
            }
        }

        if let Some(fastest) = &fastest_source {
            if !source_temperatures.contains_key(fastest) {
                return Err(DomainError::inconsistent_report(format!(
                    "fastest source {fastest} has no reading"
                )));
            }
        }

        Ok(Self {
            average_temperature: Reading::mean(source_temperatures.values()),
            source_temperatures,
            failed_sources,
            fastest_source,
        })
    }

    /// Creates the report of a request with no configured sources.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            average_temperature: 0.0,
            source_temperatures: BTreeMap::new(),
            failed_sources: Vec::new(),
            fastest_source: None,
        }
    }

    /// Returns the average of all successful readings.
    #[inline]
    #[must_use]
    pub fn average_temperature(&self) -> f64 {
        self.average_temperature
    }

    /// Returns the readings of the successful sources.
    #[inline]
    #[must_use]
    pub fn source_temperatures(&self) -> &BTreeMap<SourceName, Reading> {
        &self.source_temperatures
    }

    /// Returns the failed sources in configuration order.
    #[inline]
    #[must_use]
    pub fn failed_sources(&self) -> &[SourceName] {
        &self.failed_sources
    }

    /// Returns the fastest successful source, or `"Unknown"`.
    #[must_use]
    pub fn fastest_source(&self) -> &str {
        self.fastest_source
            .as_ref()
            .map_or(UNKNOWN_SOURCE, SourceName::as_str)
    }

    /// Returns the fastest successful source, if any.
    #[inline]
    #[must_use]
    pub fn fastest(&self) -> Option<&SourceName> {
        self.fastest_source.as_ref()
    }

    /// Returns the reading of the given source, if it succeeded.
    #[must_use]
    pub fn reading(&self, source: &str) -> Option<Reading> {
        self.source_temperatures.get(source).copied()
    }

    /// Returns every source covered by the report, successes first.
    pub fn sources(&self) -> impl Iterator<Item = &SourceName> {
        self.source_temperatures
            .keys()
            .chain(self.failed_sources.iter())
    }

    /// Returns the number of successful sources.
    #[inline]
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.source_temperatures.len()
    }

    /// Returns the number of failed sources.
    #[inline]
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed_sources.len()
    }

    /// Returns true if some, but not all, sources failed.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.source_temperatures.is_empty() && !self.failed_sources.is_empty()
    }

    /// Returns true if no source produced a reading.
    #[inline]
    #[must_use]
    pub fn has_no_readings(&self) -> bool {
        self.source_temperatures.is_empty()
    }
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WeatherReport(average={} readings={{",
            self.average_temperature
        )?;
        for (i, (source, reading)) in self.source_temperatures.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{source}={reading}")?;
        }
        write!(f, "}} failed=[")?;
        for (i, source) in self.failed_sources.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{source}")?;
        }
        write!(f, "] fastest={})", self.fastest_source())
    }
}

impl Serialize for WeatherReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("WeatherReport", 4)?;
        state.serialize_field("average_temperature", &self.average_temperature)?;
        state.serialize_field("source_temperatures", &self.source_temperatures)?;
        state.serialize_field("failed_sources", &self.failed_sources)?;
        state.serialize_field("fastest_source", self.fastest_source())?;
        state.end()
    }
}
