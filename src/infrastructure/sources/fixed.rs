//! # Fixed Source
//!
//! Deterministic source with a fixed latency and a fixed outcome.

use crate::domain::value_objects::{Location, Reading, SourceName};
use crate::infrastructure::sources::error::{SourceError, SourceResult};
use crate::infrastructure::sources::traits::WeatherSource;
use async_trait::async_trait;
use std::time::Duration;

/// Outcome produced by every call to a [`FixedSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixedOutcome {
    /// Return this reading.
    Reading(Reading),
    /// Answer without a reading.
    Empty,
    /// Fail with this error.
    Fail(SourceError),
}

/// Source that always answers the same way after the same delay.
#[derive(Debug, Clone)]
pub struct FixedSource {
    name: SourceName,
    latency: Duration,
    outcome: FixedOutcome,
}

impl FixedSource {
    /// Creates a source that returns `reading` after `latency`.
    #[must_use]
    pub fn reading(name: impl Into<SourceName>, reading: i32, latency: Duration) -> Self {
        Self {
            name: name.into(),
            latency,
            outcome: FixedOutcome::Reading(Reading::new(reading)),
        }
    }

    /// Creates a source that fails after `latency`.
    #[must_use]
    pub fn failing(name: impl Into<SourceName>, latency: Duration) -> Self {
        let name = name.into();
        let error = SourceError::unavailable(format!("{name} failed"));
        Self {
            name,
            latency,
            outcome: FixedOutcome::Fail(error),
        }
    }

    /// Creates a source that answers without a reading after `latency`.
    #[must_use]
    pub fn empty(name: impl Into<SourceName>, latency: Duration) -> Self {
        Self {
            name: name.into(),
            latency,
            outcome: FixedOutcome::Empty,
        }
    }

    /// Returns the configured latency.
    #[inline]
    #[must_use]
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Returns the configured outcome.
    #[inline]
    #[must_use]
    pub fn outcome(&self) -> &FixedOutcome {
        &self.outcome
    }
}

#[async_trait]
impl WeatherSource for FixedSource {
    fn name(&self) -> &SourceName {
        &self.name
    }

    async fn fetch_reading(&self, _location: &Location) -> SourceResult<Option<Reading>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.outcome {
            FixedOutcome::Reading(reading) => Ok(Some(*reading)),
            FixedOutcome::Empty => Ok(None),
            FixedOutcome::Fail(error) => Err(error.clone()),
        }
    }
}
