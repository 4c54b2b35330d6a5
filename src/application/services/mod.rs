//! # Application Services
//!
//! Services that orchestrate sources into reports.
//!
//! This module provides application-level services including:
//! - [`WeatherAggregationEngine`]: Concurrent fan-out and aggregation
//! - [`RaceTracker`]: Settlement board and fastest-source detector
//! - [`retry()`]: Capped-backoff retry of any async operation

pub mod race_tracker;
pub mod retry;
pub mod weather_aggregation;

pub use race_tracker::{RaceTracker, Settlement, SourceOutcome, SourceStatus};
pub use retry::{Backoff, RetryError, RetryPolicy, retry};
pub use weather_aggregation::{AggregationConfig, WeatherAggregationEngine};
