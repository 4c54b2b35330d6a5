//! # Value Objects
//!
//! Immutable types with domain semantics.
//!
//! - [`SourceName`]: name of a reading source
//! - [`RequestId`]: UUID-based identifier of one aggregation request
//! - [`Location`]: opaque place identifier passed to sources
//! - [`Reading`]: integer temperature reading

pub mod ids;
pub mod location;
pub mod reading;

pub use ids::{RequestId, SourceName};
pub use location::Location;
pub use reading::Reading;
