//! # Weather Aggregation Engine
//!
//! Fans out one request to every configured source and folds the outcomes
//! into a [`WeatherReport`].
//!
//! Each source call runs on its own task. The first source to succeed is
//! recorded as the fastest; failures never count. A global timeout bounds
//! the whole request: sources still pending at the deadline are reported as
//! failed and the request resolves with whatever settled in time.
//!
//! # Examples
//!
//! ```ignore
//! use weather_aggregator::application::services::weather_aggregation::{
//!     AggregationConfig, WeatherAggregationEngine,
//! };
//!
//! let engine = WeatherAggregationEngine::new(sources, AggregationConfig::with_timeout(5000))?;
//! let report = engine.get_aggregated_weather(&"London".into()).await?;
//! println!("{} from {}", report.average_temperature(), report.fastest_source());
//! ```

use crate::application::error::{AggregationError, AggregationResultType};
use crate::application::services::race_tracker::RaceTracker;
use crate::application::services::retry::{Backoff, RetryPolicy};
use crate::domain::entities::{UNKNOWN_SOURCE, WeatherReport};
use crate::domain::errors::DomainError;
use crate::domain::value_objects::{Location, Reading, RequestId, SourceName};
use crate::infrastructure::sources::error::{SourceError, SourceResult};
use crate::infrastructure::sources::traits::WeatherSource;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{Instrument, debug, info, info_span, warn};

/// Default global timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Configuration for weather aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationConfig {
    /// Global timeout for one request in milliseconds.
    pub timeout_ms: u64,
    /// Retries per source call after the first attempt.
    pub source_retries: u32,
    /// Backoff between retries of a source call.
    pub backoff: Backoff,
    /// Abort source tasks still running at the deadline.
    pub abort_pending_on_timeout: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            source_retries: 0,
            backoff: Backoff::default(),
            abort_pending_on_timeout: true,
        }
    }
}

impl AggregationConfig {
    /// Creates a new configuration with the specified global timeout.
    #[must_use]
    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            ..Default::default()
        }
    }

    /// Sets the number of retries per source call.
    #[must_use]
    pub fn with_source_retries(mut self, retries: u32) -> Self {
        self.source_retries = retries;
        self
    }

    /// Sets the backoff between retries.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets whether pending source tasks are aborted at the deadline.
    #[must_use]
    pub fn with_abort_pending_on_timeout(mut self, abort: bool) -> Self {
        self.abort_pending_on_timeout = abort;
        self
    }

    /// Returns the global timeout.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns the retry policy applied to each source call.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.source_retries).with_backoff(self.backoff)
    }
}

/// Engine that aggregates readings from a fixed set of sources.
#[derive(Debug)]
pub struct WeatherAggregationEngine {
    sources: Vec<Arc<dyn WeatherSource>>,
    config: AggregationConfig,
}

impl WeatherAggregationEngine {
    /// Creates a new engine.
    ///
    /// An engine without sources is valid and produces empty reports.
    ///
    /// # Errors
    ///
    /// - `AggregationError::Domain` if a source name is blank or equals the
    ///   [`UNKNOWN_SOURCE`] placeholder
    /// - `AggregationError::DuplicateSource` if two sources share a name
    pub fn new(
        sources: Vec<Arc<dyn WeatherSource>>,
        config: AggregationConfig,
    ) -> AggregationResultType<Self> {
        let mut seen = HashSet::with_capacity(sources.len());
        for source in &sources {
            let name = source.name();
            if name.is_blank() || name.as_str() == UNKNOWN_SOURCE {
                return Err(DomainError::InvalidSourceName(name.to_string()).into());
            }
            if !seen.insert(name) {
                return Err(AggregationError::DuplicateSource(name.clone()));
            }
        }

        Ok(Self { sources, config })
    }

    /// Creates a new engine with default configuration.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_defaults(sources: Vec<Arc<dyn WeatherSource>>) -> AggregationResultType<Self> {
        Self::new(sources, AggregationConfig::default())
    }

    /// Returns the configured source names in order.
    pub fn source_names(&self) -> impl Iterator<Item = &SourceName> {
        self.sources.iter().map(|source| source.name())
    }

    /// Returns the current configuration.
    #[must_use]
    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Queries every source for `location` and aggregates the readings.
    ///
    /// # Arguments
    ///
    /// * `location` - Location forwarded unchanged to every source
    ///
    /// Source failures, absent readings, panics and the global timeout are
    /// reported in the returned report, never as an error.
    ///
    /// # Errors
    ///
    /// Returns `AggregationError::Internal` if the settled outcomes cannot
    /// be assembled into a consistent report.
    pub async fn get_aggregated_weather(
        &self,
        location: &Location,
    ) -> AggregationResultType<WeatherReport> {
        let request_id = RequestId::new_v4();
        let span = info_span!(
            "aggregate",
            %request_id,
            %location,
            sources = self.sources.len()
        );
        self.aggregate(location).instrument(span).await
    }

    async fn aggregate(&self, location: &Location) -> AggregationResultType<WeatherReport> {
        let tracker = Arc::new(RaceTracker::new(self.source_names().cloned().collect()));
        let policy = self.config.retry_policy();
        let mut handles = Vec::with_capacity(self.sources.len());

        for (index, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            let tracker = Arc::clone(&tracker);
            let location = location.clone();

            let handle = tokio::spawn(
                async move {
                    let outcome = call_source(source.as_ref(), &location, policy).await;
                    tracker.settle(index, outcome);
                }
                .in_current_span(),
            );

            handles.push(handle);
        }

        let settle_all = async {
            if let Some(fastest) = tracker.resolved().await {
                debug!(fastest = %fastest, "fastest source recorded");
            }
            tracker.all_settled().await;
        };
        let timed_out = timeout(self.config.timeout(), settle_all).await.is_err();
        let settlement = tracker.seal();

        if timed_out {
            let pending: Vec<&str> = settlement
                .pending_sources()
                .map(SourceName::as_str)
                .collect();
            warn!(
                timeout_ms = self.config.timeout_ms,
                settled = tracker.settled_count(),
                pending = ?pending,
                "timeout reached before all sources settled"
            );
            if self.config.abort_pending_on_timeout {
                for handle in &handles {
                    handle.abort();
                }
            }
        }

        let report = settlement
            .into_report()
            .map_err(|e| AggregationError::internal(e.to_string()))?;

        info!(
            average = report.average_temperature(),
            fastest = report.fastest_source(),
            succeeded = report.success_count(),
            failed = report.failure_count(),
            "weather report assembled"
        );

        Ok(report)
    }
}

/// Calls one source under the retry policy.
async fn call_source(
    source: &dyn WeatherSource,
    location: &Location,
    policy: RetryPolicy,
) -> SourceResult<Reading> {
    policy
        .run_when(
            || fetch_guarded(source, location),
            SourceError::is_retryable,
            future::pending::<()>(),
        )
        .await
        .map_err(|e| {
            e.into_last_error()
                .unwrap_or_else(|| SourceError::internal("retry stopped without a failure"))
        })
}

/// Single source call with panics turned into failures.
async fn fetch_guarded(source: &dyn WeatherSource, location: &Location) -> SourceResult<Reading> {
    let outcome = match AssertUnwindSafe(source.fetch(location)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(SourceError::internal(format!(
            "source call panicked: {}",
            panic_message(panic.as_ref())
        ))),
    };

    if let Err(error) = &outcome {
        warn!(source = %source.name(), error = %error, "source call failed");
    }
    outcome
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
