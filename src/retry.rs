//! Backoff schedule and retryability classification
//!
//! The polling loop in [`crate::poller`] separates business status from
//! control flow: a status fetch yields a tagged outcome, and this module only
//! answers two questions — how long to wait before the next attempt, and
//! whether a fetch error is worth retrying at all.

use crate::config::RetryConfig;
use crate::error::Error;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, connection resets) should return
/// `true`. Permanent failures (authentication rejected, malformed response)
/// should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // One dropped connection is indistinguishable from "still
            // working"; both warrant waiting and re-checking.
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // A structured response from the service, even an error, means
            // the request went through; retrying will not change the answer.
            Error::Api { .. } => false,
            Error::Config { .. } => false,
            Error::Validation(_) => false,
            Error::Serialization(_) => false,
            Error::Signing(_) => false,
            Error::PollTimeout { .. } => false,
            Error::Download { .. } => false,
        }
    }
}

/// Iterator over the delays of an exponential backoff schedule
///
/// Yields `initial_delay`, then multiplies by `backoff_multiplier` after each
/// call, capped at `max_delay`. Purely computational; the caller sleeps.
#[derive(Debug)]
pub struct Backoff {
    next_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
}

impl Backoff {
    /// Create a schedule from the retry configuration
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            next_delay: config.initial_delay,
            max_delay: config.max_delay,
            multiplier: config.backoff_multiplier,
        }
    }

    /// The delay to wait before the next attempt, advancing the schedule
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next_delay;
        let grown = Duration::from_secs_f64(delay.as_secs_f64() * self.multiplier);
        self.next_delay = grown.min(self.max_delay);
        delay
    }
}
