//! Events and handlers for the [`AnnotationSession`](super::AnnotationSession).
//!
//! The session communicates with its frontend through [`SessionEvent`]
//! variants covering the full annotation lifecycle — token activation,
//! suggestion listing, applied annotations, focus movement, saves, and
//! failures. Frontends implement [`EventHandler`] to restyle the document,
//! update the workbench panes, or surface notifications.
//!
//! # Choosing an event handler
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or headless runs |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`FnEventHandler`] | Quick closures for simple callbacks |
//! | [`CompositeEventHandler`] | Compose multiple handlers in order |
//! | Custom `impl EventHandler` | Full control (DOM patching, metrics) |

use crate::document::focus::FocusChange;
use crate::document::tree::NodeId;
use crate::transport::governor::RequestError;
use crate::ui::pagination::PageWindow;
use crate::{LookupMode, RequestKind};
use tracing::{debug, error, info, warn};

// ── Events ─────────────────────────────────────────────────────────

/// Events emitted by the session as it coordinates the annotation flow.
#[derive(Debug)]
pub enum SessionEvent<'a> {
    /// A token became the focused one and a lookup was submitted.
    TokenActivated { token: NodeId, mode: LookupMode },
    /// Normalization suggestions arrived for the focused token (manual
    /// mode). The first suggestion, if any, is pre-selected.
    SuggestionsListed {
        token: NodeId,
        count: usize,
        preselected: Option<&'a str>,
    },
    /// Annotation candidates arrived and the first one populated the form.
    CandidatesListed { count: usize },
    /// An annotation was committed to a token.
    AnnotationApplied { token: NodeId, mode: LookupMode },
    /// Automatic mode had no suggestion for this token; it was skipped.
    TokenSkipped { token: NodeId },
    /// Focus moved to the next token in document order.
    FocusAdvanced { from: NodeId, to: NodeId },
    /// No further token exists after the given one.
    DocumentEndReached { last: NodeId },
    /// The focus range grew or shrank by one token.
    FocusRangeChanged { change: FocusChange },
    /// An explicit save-document action started; the save icon is busy.
    SaveStarted,
    /// The document was saved.
    SaveCompleted,
    /// An in-flight affordance (save icon, search button) returned to its
    /// resting state.
    AffordanceRestored { kind: RequestKind },
    /// A search round-trip finished; `window` is present when the result
    /// set is paginated.
    SearchCompleted {
        markup: &'a str,
        window: Option<&'a PageWindow>,
    },
    /// A terminal failure the operator must see.
    ErrorNotified {
        kind: RequestKind,
        error: &'a RequestError,
    },
    /// The backend reported a logical failure; logged, nothing surfaced.
    ApplicationErrorIgnored { kind: RequestKind, message: &'a str },
    /// A submission was rejected because a request is already in flight.
    SubmissionRejected { kind: RequestKind },
}

// ── Handler trait ──────────────────────────────────────────────────

/// Handler for session events.
///
/// Implement this trait to react to the annotation flow — patching the
/// rendered document, filling the suggestion panes, toggling icons, or
/// surfacing notifications. All events are informational; handlers cannot
/// veto anything.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &SessionEvent<'_>) {
        let _ = event;
    }
}

/// A no-op event handler.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler that logs every event via `tracing`.
///
/// Failures log at WARN/ERROR (so the
/// [`NotificationLayer`](crate::ui::notify::NotificationLayer) captures
/// them), routine flow at DEBUG/INFO.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &SessionEvent<'_>) {
        match event {
            SessionEvent::TokenActivated { token, mode } => {
                debug!("token {token:?} activated ({mode:?})");
            }
            SessionEvent::SuggestionsListed { count, .. } => {
                debug!("{count} normalization suggestion(s) listed");
            }
            SessionEvent::CandidatesListed { count } => {
                debug!("{count} annotation candidate(s) listed");
            }
            SessionEvent::AnnotationApplied { token, mode } => {
                info!("annotation applied to {token:?} ({mode:?})");
            }
            SessionEvent::TokenSkipped { token } => {
                debug!("no suggestion for {token:?}, skipped");
            }
            SessionEvent::FocusAdvanced { from, to } => {
                debug!("focus advanced {from:?} -> {to:?}");
            }
            SessionEvent::DocumentEndReached { last } => {
                info!("document end reached at {last:?}");
            }
            SessionEvent::FocusRangeChanged { change } => {
                debug!("focus range changed: {change:?}");
            }
            SessionEvent::SaveStarted => info!("document save started"),
            SessionEvent::SaveCompleted => info!("document saved"),
            SessionEvent::AffordanceRestored { kind } => {
                debug!("{kind} affordance restored");
            }
            SessionEvent::SearchCompleted { window, .. } => {
                debug!(
                    "search completed ({} pages)",
                    window.map_or(1, |w| w.total_pages)
                );
            }
            SessionEvent::ErrorNotified { kind, error } => {
                error!("{kind} failed: {error}");
            }
            SessionEvent::ApplicationErrorIgnored { kind, message } => {
                debug!("{kind} application error ignored: {message}");
            }
            SessionEvent::SubmissionRejected { kind } => {
                warn!("{kind} rejected: a request is already in flight");
            }
        }
    }
}

/// An event handler backed by a closure.
pub struct FnEventHandler<F>(F)
where
    F: Fn(&SessionEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&SessionEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&SessionEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &SessionEvent<'_>) {
        (self.0)(event)
    }
}

/// An event handler that delegates to multiple inner handlers, in
/// registration order.
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Add a handler to the chain.
    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }
}

impl Default for CompositeEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for CompositeEventHandler {
    fn on_event(&self, event: &SessionEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}
