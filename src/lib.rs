//! # Weather Aggregator
//!
//! Concurrent aggregation of temperature readings from unreliable sources.
//!
//! One request fans out to every configured source on its own task. The
//! engine records the first source to succeed, tolerates partial failure,
//! averages the successful readings and bounds the whole request with a
//! global timeout. A generic retry wrapper with capped backoff can be used
//! on its own or around each source call.
//!
//! ## Layers
//!
//! - [`domain`]: value objects, the [`WeatherReport`] entity, invariant errors
//! - [`application`]: [`WeatherAggregationEngine`], race tracking, [`retry()`]
//! - [`infrastructure`]: the [`WeatherSource`] port and its adapters
//! - [`config`]: layered configuration
//!
//! ## Example
//!
//! ```no_run
//! use weather_aggregator::{
//!     AggregationConfig, SimulationProfile, WeatherAggregationEngine, reference_sources,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let sources = reference_sources(SimulationProfile::default(), None);
//! let engine = WeatherAggregationEngine::new(sources, AggregationConfig::default())?;
//!
//! let report = engine.get_aggregated_weather(&"London".into()).await?;
//! println!("Average temperature: {}", report.average_temperature());
//! println!("Fastest source: {}", report.fastest_source());
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::error::{AggregationError, AggregationResultType};
pub use application::services::retry::{Backoff, RetryError, RetryPolicy, retry};
pub use application::services::weather_aggregation::{
    AggregationConfig, WeatherAggregationEngine,
};
pub use domain::entities::WeatherReport;
pub use domain::value_objects::{Location, Reading, RequestId, SourceName};
pub use infrastructure::sources::{
    FixedSource, FnSource, HttpSource, SimulatedSource, SimulationProfile, SourceError,
    WeatherSource, reference_sources,
};
