//! # Application Errors
//!
//! Error types for the application layer.
//!
//! Per-source failures and the global timeout never surface here: they are
//! folded into the report. Only construction mistakes and internal faults
//! propagate to the caller.
//!
//! # Error Hierarchy
//!
//! ```text
//! AggregationError
//! ├── Domain(DomainError)        - Invalid source name or inconsistent report
//! ├── DuplicateSource(SourceName) - Two sources share a name
//! └── Internal(String)           - Unexpected fault while aggregating
//! ```
//!
//! # Examples
//!
//! ```
//! use weather_aggregator::application::error::AggregationError;
//! use weather_aggregator::domain::value_objects::SourceName;
//!
//! let err = AggregationError::DuplicateSource(SourceName::new("API1"));
//! assert_eq!(err.to_string(), "duplicate source name: API1");
//! ```

use crate::domain::errors::DomainError;
use crate::domain::value_objects::SourceName;
use thiserror::Error;

/// Error type for aggregation operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    /// Domain error from value construction or report assembly.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// Two configured sources share the same name.
    #[error("duplicate source name: {0}")]
    DuplicateSource(SourceName),

    /// Unexpected internal fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AggregationError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Result type for aggregation operations.
pub type AggregationResultType<T> = Result<T, AggregationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_converts() {
        let err: AggregationError = DomainError::InvalidSourceName("  ".to_string()).into();
        assert!(matches!(err, AggregationError::Domain(_)));
        assert!(err.to_string().starts_with("domain error:"));
    }

    #[test]
    fn internal_display() {
        let err = AggregationError::internal("board poisoned");
        assert_eq!(err.to_string(), "internal error: board poisoned");
    }
}
