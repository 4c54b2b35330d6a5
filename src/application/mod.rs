//! # Application Layer
//!
//! Aggregation engine, race tracking and retry, built on the domain types
//! and the source port.

pub mod error;
pub mod services;

pub use error::{AggregationError, AggregationResultType};
