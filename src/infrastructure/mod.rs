//! # Infrastructure Layer
//!
//! Adapters to the outside world: the sources readings come from.

pub mod sources;
