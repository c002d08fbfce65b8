//! The annotation session: state machine, events, and search replacement.
//!
//! - [`state::AnnotationSession`] — the coordinator driving the governor,
//!   the traversal, and the activation engine in response to operator
//!   actions. Start here.
//! - [`events`] — [`SessionEvent`](events::SessionEvent) and the
//!   [`EventHandler`](events::EventHandler) trait frontends implement.
//! - [`search`] — replace queries over search results with derived-field
//!   consistency.

pub mod events;
pub mod search;
pub mod state;

// Re-export commonly used items at the module level.
pub use events::{
    CompositeEventHandler, EventHandler, FnEventHandler, LoggingHandler, NoopHandler, SessionEvent,
};
pub use search::{FieldValues, ReplaceField, ReplaceQuery, Replacement};
pub use state::{AnnotationSession, SessionError, SessionState};
