//! # Weather Source Trait
//!
//! Port definition for reading sources.
//!
//! This module defines the [`WeatherSource`] trait that every source
//! integration implements. The aggregation engine only ever talks to sources
//! through this trait.
//!
//! # Examples
//!
//! ```ignore
//! use weather_aggregator::infrastructure::sources::traits::WeatherSource;
//!
//! struct MySource { /* ... */ }
//!
//! #[async_trait::async_trait]
//! impl WeatherSource for MySource {
//!     // ... implement required methods
//! }
//! ```

use crate::domain::value_objects::{Location, Reading, SourceName};
use crate::infrastructure::sources::error::{SourceError, SourceResult};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;

/// Trait defining the interface for reading sources.
///
/// # Error Handling
///
/// A source signals failure either by returning an error or by returning
/// `Ok(None)`. Both are treated identically by the engine: the source is
/// listed as failed.
#[async_trait]
pub trait WeatherSource: Send + Sync + fmt::Debug {
    /// Returns the source name.
    fn name(&self) -> &SourceName;

    /// Requests the current reading for a location.
    ///
    /// # Errors
    ///
    /// - `SourceError::Timeout` - Request timed out
    /// - `SourceError::Unavailable` - Source could not answer
    /// - `SourceError::Connection` - Cannot reach the source
    async fn fetch_reading(&self, location: &Location) -> SourceResult<Option<Reading>>;

    /// Requests the reading, mapping an absent value to `SourceError::NoReading`.
    async fn fetch(&self, location: &Location) -> SourceResult<Reading> {
        self.fetch_reading(location)
            .await?
            .ok_or_else(|| SourceError::no_reading(self.name().as_str()))
    }
}

/// Source backed by an async closure.
///
/// Handy for wiring ad-hoc sources and for tests that need to script each
/// call.
pub struct FnSource<F> {
    name: SourceName,
    call: F,
}

impl<F, Fut> FnSource<F>
where
    F: Fn(Location) -> Fut + Send + Sync,
    Fut: Future<Output = SourceResult<Option<Reading>>> + Send,
{
    /// Creates a new closure-backed source.
    #[must_use]
    pub fn new(name: impl Into<SourceName>, call: F) -> Self {
        Self {
            name: name.into(),
            call,
        }
    }
}

impl<F> fmt::Debug for FnSource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSource").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut> WeatherSource for FnSource<F>
where
    F: Fn(Location) -> Fut + Send + Sync,
    Fut: Future<Output = SourceResult<Option<Reading>>> + Send,
{
    fn name(&self) -> &SourceName {
        &self.name
    }

    async fn fetch_reading(&self, location: &Location) -> SourceResult<Option<Reading>> {
        (self.call)(location.clone()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_maps_absent_reading_to_error() {
        let source = FnSource::new("API1", |_location| async { Ok(None) });

        let err = source.fetch(&Location::from("Paris")).await.unwrap_err();
        assert_eq!(err, SourceError::no_reading("API1"));
    }

    #[tokio::test]
    async fn fetch_passes_location_through() {
        let source = FnSource::new("API1", |location: Location| async move {
            let value = if location.as_str() == "Oslo" { -3 } else { 25 };
            Ok(Some(Reading::new(value)))
        });

        let reading = source.fetch(&Location::from("Oslo")).await.unwrap();
        assert_eq!(reading, Reading::new(-3));
        assert_eq!(source.name().as_str(), "API1");
    }

    #[tokio::test]
    async fn fetch_propagates_errors() {
        let source = FnSource::new("API2", |_location| async {
            Err(SourceError::unavailable("Fail in API2"))
        });

        let err = source.fetch(&Location::from("Paris")).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
