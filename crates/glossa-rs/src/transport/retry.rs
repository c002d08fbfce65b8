//! Bounded retry with a fixed delay for conflict-class responses.
//!
//! A save or lookup can collide with a concurrent editor on the backend
//! (HTTP 409); those are retried a configured number of times with a fixed
//! pause between attempts. Every other failure class is terminal — timeouts
//! and network errors are surfaced immediately, never retried.

use crate::BackendError;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries (0 = no retries, fail on first conflict).
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given number of retries and the default delay.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_retries: retries,
            ..Default::default()
        }
    }

    /// Create a policy with the given retries and delay.
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self {
            max_retries: retries,
            delay,
        }
    }

    /// The delay before a given retry attempt (1-indexed). The schedule is
    /// flat — every attempt waits the same configured duration.
    pub fn delay_for_attempt(&self, _attempt: u32) -> Duration {
        self.delay
    }

    /// Whether another retry may be made after `attempts` failed tries.
    pub fn allows(&self, attempts: u32) -> bool {
        attempts < self.max_retries
    }
}

/// Whether a backend failure is a conflict-class (retryable) response.
pub fn is_conflict(error: &BackendError) -> bool {
    matches!(error, BackendError::Http { status: 409, .. })
}
