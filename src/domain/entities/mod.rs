//! # Domain Entities
//!
//! - [`WeatherReport`]: aggregated result of one request

pub mod weather_report;

pub use weather_report::{UNKNOWN_SOURCE, WeatherReport};
