//! # Retry
//!
//! Re-invokes a failing async operation with capped backoff.
//!
//! The operation is given as a factory: every attempt calls it again to get
//! a fresh future, since a future cannot be restarted once it has run.
//! Waits between attempts are timer sleeps and never block a worker thread.
//!
//! # Examples
//!
//! ```ignore
//! use weather_aggregator::application::services::retry::retry;
//!
//! // At most 1 + 3 attempts, waiting 1s, 2s, 3s between them.
//! let reading = retry(|| source.fetch(&location), 3).await?;
//! ```

use std::fmt;
use std::future::{self, Future};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default step of the linear backoff.
const DEFAULT_STEP_MS: u64 = 1000;

/// Default cap of the linear backoff.
const DEFAULT_MAX_DELAY_MS: u64 = 5000;

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Delay grows by `step` per retry: `min(retry * step, max)`.
    Linear {
        /// Increment per retry.
        step: Duration,
        /// Upper bound of the delay.
        max: Duration,
    },
    /// Delay multiplies by `factor` per retry: `min(base * factor^(retry - 1), max)`.
    Exponential {
        /// Delay before the first retry.
        base: Duration,
        /// Multiplicative factor for each subsequent retry.
        factor: f64,
        /// Upper bound of the delay.
        max: Duration,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Linear {
            step: Duration::from_millis(DEFAULT_STEP_MS),
            max: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl Backoff {
    /// Calculates the delay before the given retry.
    ///
    /// `retry` is 1 for the first retry (the second attempt).
    #[must_use]
    pub fn delay(self, retry: u32) -> Duration {
        let retry = retry.max(1);
        match self {
            Self::Fixed { delay } => delay,
            Self::Linear { step, max } => step.saturating_mul(retry).min(max),
            Self::Exponential { base, factor, max } => {
                let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
                let seconds = base.as_secs_f64() * factor.powi(exponent);
                if !seconds.is_finite() || seconds >= max.as_secs_f64() {
                    max
                } else {
                    Duration::from_secs_f64(seconds.max(0.0))
                }
            }
        }
    }
}

/// Failure of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every allowed attempt failed; carries the last failure.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Failure of the last attempt.
        source: E,
    },

    /// An attempt failed with an error the retry predicate rejected.
    #[error("permanent failure after {attempts} attempts: {source}")]
    Permanent {
        /// Number of attempts made.
        attempts: u32,
        /// The failure that stopped the loop.
        source: E,
    },

    /// The cancellation signal fired during an attempt or a backoff wait.
    #[error("retry cancelled after {attempts} attempts")]
    Cancelled {
        /// Number of attempts started, including an interrupted one.
        attempts: u32,
        /// Failure of the last completed attempt, if any.
        last: Option<E>,
    },
}

impl<E> RetryError<E> {
    /// Returns the number of attempts made.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Permanent { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// Returns the last failure, if one was recorded.
    #[must_use]
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { source, .. } | Self::Permanent { source, .. } => Some(source),
            Self::Cancelled { last, .. } => last.as_ref(),
        }
    }

    /// Consumes the error, returning the last failure, if one was recorded.
    #[must_use]
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Exhausted { source, .. } | Self::Permanent { source, .. } => Some(source),
            Self::Cancelled { last, .. } => last,
        }
    }

    /// Returns true if the loop stopped because of the cancellation signal.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Progress of one retry loop.
struct RetryState<E> {
    attempts: u32,
    retries_remaining: u32,
    last_error: Option<E>,
}

impl<E> RetryState<E> {
    fn new(max_retries: u32) -> Self {
        Self {
            attempts: 0,
            retries_remaining: max_retries,
            last_error: None,
        }
    }

    fn cancelled(self) -> RetryError<E> {
        RetryError::Cancelled {
            attempts: self.attempts,
            last: self.last_error,
        }
    }
}

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy {
    /// Creates a policy with the default linear backoff.
    ///
    /// Total attempts are at most `max_retries + 1`.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::default(),
        }
    }

    /// Creates a policy that makes a single attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns the number of retries after the first attempt.
    #[inline]
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the backoff strategy.
    #[inline]
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Calculates the delay before the given retry (1-based).
    #[must_use]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff.delay(retry)
    }

    /// Runs the operation, retrying every failure.
    ///
    /// # Errors
    ///
    /// Returns `RetryError::Exhausted` carrying the last failure once all
    /// attempts have failed.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.run_when(operation, |_| true, future::pending::<()>())
            .await
    }

    /// Runs the operation until it succeeds, the attempts run out, or
    /// `cancel` completes.
    ///
    /// # Errors
    ///
    /// Returns `RetryError::Exhausted` when all attempts failed and
    /// `RetryError::Cancelled` when the signal fired first. An in-flight
    /// attempt is dropped on cancellation.
    pub async fn run_until<T, E, F, Fut, C>(
        &self,
        operation: F,
        cancel: C,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        C: Future<Output = ()>,
    {
        self.run_when(operation, |_| true, cancel).await
    }

    /// Runs the operation, retrying only failures accepted by `should_retry`.
    ///
    /// # Arguments
    ///
    /// * `operation` - Factory producing one attempt per call
    /// * `should_retry` - Returns false for failures that must not be retried
    /// * `cancel` - Future that stops the loop when it completes
    ///
    /// # Errors
    ///
    /// Same as [`run_until`](Self::run_until), plus `RetryError::Permanent`
    /// when `should_retry` rejects a failure.
    pub async fn run_when<T, E, F, Fut, P, C>(
        &self,
        mut operation: F,
        should_retry: P,
        cancel: C,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        P: Fn(&E) -> bool,
        C: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        let mut state = RetryState::new(self.max_retries);

        loop {
            state.attempts += 1;
            let attempt = operation();

            let outcome = tokio::select! {
                biased;
                () = &mut cancel => return Err(state.cancelled()),
                outcome = attempt => outcome,
            };

            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !should_retry(&error) {
                return Err(RetryError::Permanent {
                    attempts: state.attempts,
                    source: error,
                });
            }
            if state.retries_remaining == 0 {
                return Err(RetryError::Exhausted {
                    attempts: state.attempts,
                    source: error,
                });
            }

            state.retries_remaining -= 1;
            let delay = self.backoff.delay(state.attempts);
            debug!(
                attempt = state.attempts,
                retries_remaining = state.retries_remaining,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "attempt failed, backing off"
            );
            state.last_error = Some(error);

            tokio::select! {
                biased;
                () = &mut cancel => return Err(state.cancelled()),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Runs `operation` up to `max_retries + 1` times with the default backoff.
///
/// The delay before retry `n` is `min(n * 1s, 5s)`. On exhaustion the last
/// failure is returned, not the first.
///
/// # Arguments
///
/// * `operation` - Factory producing one attempt per call
/// * `max_retries` - Retries after the first attempt; zero means a single call
///
/// # Errors
///
/// Returns `RetryError::Exhausted` once every attempt has failed.
pub async fn retry<T, E, F, Fut>(operation: F, max_retries: u32) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    RetryPolicy::new(max_retries).run(operation).await
}
