//! # Source Errors
//!
//! Error types for reading-source operations.
//!
//! # Examples
//!
//! ```
//! use weather_aggregator::infrastructure::sources::error::SourceError;
//!
//! let error = SourceError::timeout("Request timed out after 5000ms");
//! assert!(error.is_retryable());
//!
//! let error = SourceError::no_reading("API2");
//! assert!(!error.is_retryable());
//! ```

use thiserror::Error;

/// Error type for a single source call.
///
/// Every variant is a per-source failure: the aggregation engine reports the
/// source as failed and carries on with the others.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Request timed out.
    #[error("source timeout: {message}")]
    Timeout {
        /// Error message.
        message: String,
        /// Timeout duration in milliseconds.
        timeout_ms: Option<u64>,
    },

    /// Network or connection error.
    #[error("source connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("source rate limit exceeded: {message}")]
    RateLimited {
        /// Error message.
        message: String,
    },

    /// The source is temporarily unable to answer.
    #[error("source unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
    },

    /// The source answered without a reading.
    #[error("source returned no reading: {source_name}")]
    NoReading {
        /// Name of the source.
        source_name: String,
    },

    /// Protocol or format error.
    #[error("source protocol error: {message}")]
    Protocol {
        /// Error message.
        message: String,
    },

    /// Internal error, including a panicking source call.
    #[error("source internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl SourceError {
    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            timeout_ms: None,
        }
    }

    /// Creates a timeout error with duration.
    #[must_use]
    pub fn timeout_with_duration(message: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            message: message.into(),
            timeout_ms: Some(timeout_ms),
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a rate limited error.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a missing reading error.
    #[must_use]
    pub fn no_reading(source_name: impl Into<String>) -> Self {
        Self::NoReading {
            source_name: source_name.into(),
        }
    }

    /// Creates a protocol error.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error is transient and may succeed on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Connection { .. }
                | Self::RateLimited { .. }
                | Self::Unavailable { .. }
        )
    }

    /// Returns the timeout in milliseconds, if this is a timeout with a known duration.
    #[must_use]
    pub fn timeout_ms(&self) -> Option<u64> {
        match self {
            Self::Timeout { timeout_ms, .. } => *timeout_ms,
            _ => None,
        }
    }
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;
