//! Convenience re-exports for common `glossa-rs` types.
//!
//! Meant to be glob-imported by frontends:
//!
//! ```ignore
//! use glossa_rs::prelude::*;
//! ```
//!
//! This pulls in the types needed by the vast majority of embedding code:
//! the backend and envelope types, the [`AnnotationSession`] + events, the
//! document tree, and the menu config. Specialized types (retry policy,
//! ordering rules, notification layer internals) are intentionally
//! excluded — import those from their modules directly when needed.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{
    AnnotationCandidate, AutoLookup, Backend, BackendError, BackendResponse, HttpBackend,
    LookupMode, RequestEnvelope, RequestKind, RequestPayload, RequestScope, SearchForm,
};

// ── Transport ───────────────────────────────────────────────────────
pub use crate::transport::{Outcome, RequestError, RequestGovernor, RetryPolicy, SubmitRejected};

// ── Document ────────────────────────────────────────────────────────
pub use crate::document::{
    DocumentTree, FocusChange, FocusRangeManager, NodeId, NodeKind, OrderedTree, TokenAnnotation,
    TokenFields, next_match,
};

// ── Annotation ──────────────────────────────────────────────────────
pub use crate::annotation::{
    Activation, AnnotationForm, DependencyExpr, FieldActivationEngine, FieldDescriptor, FieldKind,
    MenuConfig, TagRef, TagSelection,
};

// ── Session ─────────────────────────────────────────────────────────
pub use crate::session::{
    AnnotationSession, CompositeEventHandler, EventHandler, FnEventHandler, LoggingHandler,
    NoopHandler, SessionError, SessionEvent, SessionState,
};

// ── UI ──────────────────────────────────────────────────────────────
pub use crate::ui::notify::NotificationLayer;
pub use crate::ui::{PageEntry, PageWindow, PlaybackIndicator, SaveControl, SaveIcon};
