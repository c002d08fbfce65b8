//! The annotated document as the engine sees it.
//!
//! - [`tree`] — arena-backed [`DocumentTree`](tree::DocumentTree) of
//!   utterances and tokens with parent/children/sibling access.
//! - [`token`] — per-token derived fields and the atomic
//!   [`TokenAnnotation`](token::TokenAnnotation) commit.
//! - [`traversal`] — generic iterative next-match search in document order
//!   over the [`OrderedTree`](traversal::OrderedTree) interface.
//! - [`focus`] — [`FocusRangeManager`](focus::FocusRangeManager), the
//!   bidirectional focus range used when merging adjacent tokens.

pub mod focus;
pub mod token;
pub mod traversal;
pub mod tree;

// Re-export commonly used items at the module level.
pub use focus::{FocusChange, FocusRangeManager};
pub use token::{TokenAnnotation, TokenFields};
pub use traversal::{OrderedTree, next_match};
pub use tree::{DocumentTree, NodeId, NodeKind};
