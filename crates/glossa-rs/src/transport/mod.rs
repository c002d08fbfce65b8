//! Transport layer: single-flight request governance and bounded retry.
//!
//! Everything between the [`AnnotationSession`](crate::session::AnnotationSession)
//! and the [`Backend`](crate::Backend) lives here:
//!
//! - [`retry`] — conflict-class error detection (HTTP 409) with a fixed-delay,
//!   bounded-attempt schedule. Never retries other failures.
//! - [`governor`] — [`RequestGovernor`], the single-flight lock around the
//!   one outstanding request, its per-attempt timeout, and the
//!   [`RequestError`](governor::RequestError) taxonomy.

pub mod governor;
pub mod retry;

// Re-export commonly used items at the module level.
pub use governor::{Outcome, RequestError, RequestGovernor, SubmitRejected};
pub use retry::RetryPolicy;
