//! Single-flight request governor.
//!
//! The [`RequestGovernor`] owns the one outstanding asynchronous operation.
//! A second [`submit`](RequestGovernor::submit) while one is in flight is
//! rejected synchronously — never queued — and logged. Each attempt runs
//! under a deadline; conflict-class failures are retried per the configured
//! [`RetryPolicy`]; every terminal outcome releases the lock before control
//! returns to the caller, which then routes the outcome by request kind.

use super::retry::{self, RetryPolicy};
use crate::{Backend, BackendResponse, RequestEnvelope};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-attempt response deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

// ── Errors ─────────────────────────────────────────────────────────

/// Terminal failure of a governed request.
///
/// Conflict-class responses are not represented here: they are recovered
/// locally by the retry loop, and exhaustion surfaces as [`Transport`].
///
/// [`Transport`]: RequestError::Transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// No response arrived within the configured deadline.
    Timeout,
    /// Transport-level failure, including exhausted conflict retries.
    Transport(String),
    /// The backend reported an in-band logical failure. Logged only —
    /// never surfaced as a blocking notification.
    Application(String),
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::Timeout => write!(f, "request timed out"),
            RequestError::Transport(msg) => write!(f, "transport error: {msg}"),
            RequestError::Application(msg) => write!(f, "application error: {msg}"),
        }
    }
}

/// Rejection of a `submit` made while another request is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitRejected;

impl std::fmt::Display for SubmitRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a request is already in flight")
    }
}

/// Terminal outcome of a governed request.
#[derive(Debug)]
pub enum Outcome {
    Success(BackendResponse),
    Failed(RequestError),
}

impl Outcome {
    /// The error, if this outcome is a failure.
    pub fn error(&self) -> Option<&RequestError> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failed(err) => Some(err),
        }
    }
}

// ── RequestGovernor ────────────────────────────────────────────────

/// Owner of the single outstanding backend request and its retry policy.
///
/// The busy flag is the sole coordination primitive: the engine is
/// single-threaded and cooperative, so no further locking is needed. The
/// flag is held for the whole submit — including retry sleeps — and is
/// cleared on every terminal outcome before `submit` returns.
pub struct RequestGovernor {
    busy: AtomicBool,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Default for RequestGovernor {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestGovernor {
    pub fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the per-attempt response deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the conflict retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Whether a request is currently outstanding.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Submit an envelope to the backend.
    ///
    /// Returns `Err(SubmitRejected)` immediately if another request is
    /// outstanding. Otherwise drives the request to a terminal [`Outcome`]:
    /// per-attempt timeout, bounded conflict retry, and classification of
    /// in-band backend errors. The lock is released before this returns,
    /// so the caller can route the outcome and accept the next action.
    pub async fn submit(
        &self,
        backend: &dyn Backend,
        envelope: &RequestEnvelope,
    ) -> Result<Outcome, SubmitRejected> {
        if self.busy.swap(true, Ordering::SeqCst) {
            warn!(
                "rejected {} submission: a request is already in flight",
                envelope.kind()
            );
            return Err(SubmitRejected);
        }

        let outcome = self.drive(backend, envelope).await;
        self.busy.store(false, Ordering::SeqCst);
        Ok(outcome)
    }

    /// Run the attempt/retry loop to a terminal outcome.
    async fn drive(&self, backend: &dyn Backend, envelope: &RequestEnvelope) -> Outcome {
        let kind = envelope.kind();
        let mut attempts: u32 = 0;

        loop {
            match tokio::time::timeout(self.timeout, backend.send(envelope)).await {
                Err(_) => {
                    warn!("{kind} timed out after {:?}", self.timeout);
                    return Outcome::Failed(RequestError::Timeout);
                }
                Ok(Ok(response)) => {
                    if let Some(message) = response.error {
                        debug!("{kind} reported an application error: {message}");
                        return Outcome::Failed(RequestError::Application(message));
                    }
                    return Outcome::Success(response);
                }
                Ok(Err(err)) if retry::is_conflict(&err) && self.retry.allows(attempts) => {
                    attempts += 1;
                    let delay = self.retry.delay_for_attempt(attempts);
                    debug!(
                        "{kind} hit a conflict, retry {attempts}/{} in {:?}",
                        self.retry.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(Err(err)) => {
                    let message = if retry::is_conflict(&err) {
                        format!("{err} (after {attempts} retries)")
                    } else {
                        err.to_string()
                    };
                    warn!("{kind} failed: {message}");
                    return Outcome::Failed(RequestError::Transport(message));
                }
            }
        }
    }
}
