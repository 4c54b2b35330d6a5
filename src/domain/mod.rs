//! # Domain Layer
//!
//! Value objects, entities and invariant errors. Nothing in this layer
//! performs I/O or knows about the async runtime.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use errors::{DomainError, DomainResult};
