//! # Reading Sources
//!
//! Source integrations and the port they implement.
//!
//! - [`WeatherSource`]: trait every source implements
//! - [`SimulatedSource`]: random latency and random failures
//! - [`FixedSource`]: fixed latency and fixed outcome
//! - [`HttpSource`]: JSON endpoint over HTTP
//! - [`FnSource`]: async closure adapter

pub mod error;
pub mod fixed;
pub mod http;
pub mod simulated;
pub mod traits;

pub use error::{SourceError, SourceResult};
pub use fixed::{FixedOutcome, FixedSource};
pub use http::HttpSource;
pub use simulated::{SimulatedSource, SimulationProfile, reference_sources};
pub use traits::{FnSource, WeatherSource};
