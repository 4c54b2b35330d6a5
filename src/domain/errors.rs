//! # Domain Errors
//!
//! Error types for domain invariant violations.

use thiserror::Error;

/// Error raised when a domain value or entity would violate an invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A source name was empty or whitespace only.
    #[error("invalid source name: {0:?}")]
    InvalidSourceName(String),

    /// A report's success map, failure list and fastest marker disagree.
    #[error("inconsistent report: {0}")]
    InconsistentReport(String),
}

impl DomainError {
    /// Creates an inconsistent report error.
    #[must_use]
    pub fn inconsistent_report(message: impl Into<String>) -> Self {
        Self::InconsistentReport(message.into())
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
