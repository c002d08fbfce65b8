//! Bidirectional focus range for merging adjacent tokens.
//!
//! The operator grows a contiguous run of focused tokens outward from a
//! single anchor with "extend left" / "extend right" actions. Each side is
//! a stack of extensions; extending toward a non-empty opposite stack pops
//! it instead of growing — undo takes priority over growth. The focused set
//! is always the contiguous run from the deepest left extension through the
//! anchor to the deepest right extension.

use super::tree::{DocumentTree, NodeId};

/// Result of one extend operation, for the frontend to restyle tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    /// A token was added to the run and should be marked focused.
    Focused(NodeId),
    /// A token was removed from the run and should be unmarked.
    Unfocused(NodeId),
    /// Nothing changed (no sibling token to grow onto).
    None,
}

/// Contiguous focus range built from an anchor plus two extension stacks.
#[derive(Debug, Default)]
pub struct FocusRangeManager {
    anchor: Option<NodeId>,
    left: Vec<NodeId>,
    right: Vec<NodeId>,
}

impl FocusRangeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current anchor, if a range is in progress.
    pub fn anchor(&self) -> Option<NodeId> {
        self.anchor
    }

    /// Forget the range. Called when focus moves to another token, so the
    /// next extend starts a fresh range from the newly focused token.
    pub fn clear(&mut self) {
        self.anchor = None;
        self.left.clear();
        self.right.clear();
    }

    /// The focused run, left to right. Empty when no range is in progress.
    pub fn focused(&self) -> Vec<NodeId> {
        let Some(anchor) = self.anchor else {
            return Vec::new();
        };
        let mut run: Vec<NodeId> = self.left.iter().rev().copied().collect();
        run.push(anchor);
        run.extend(self.right.iter().copied());
        run
    }

    /// Extend the run one token to the left, or shrink it from the right if
    /// a right extension exists.
    pub fn extend_left(&mut self, tree: &DocumentTree, focused: NodeId) -> FocusChange {
        let anchor = self.ensure_anchor(focused);
        if let Some(popped) = self.right.pop() {
            return FocusChange::Unfocused(popped);
        }
        let base = self.left.last().copied().unwrap_or(anchor);
        match tree.left_token_neighbor(base) {
            Some(next) => {
                self.left.push(next);
                FocusChange::Focused(next)
            }
            None => FocusChange::None,
        }
    }

    /// Mirror of [`extend_left`](Self::extend_left).
    pub fn extend_right(&mut self, tree: &DocumentTree, focused: NodeId) -> FocusChange {
        let anchor = self.ensure_anchor(focused);
        if let Some(popped) = self.left.pop() {
            return FocusChange::Unfocused(popped);
        }
        let base = self.right.last().copied().unwrap_or(anchor);
        match tree.right_token_neighbor(base) {
            Some(next) => {
                self.right.push(next);
                FocusChange::Focused(next)
            }
            None => FocusChange::None,
        }
    }

    /// Start a fresh range from `focused` unless one is already anchored.
    /// Returns the effective anchor.
    fn ensure_anchor(&mut self, focused: NodeId) -> NodeId {
        match self.anchor {
            Some(anchor) => anchor,
            None => {
                self.left.clear();
                self.right.clear();
                self.anchor = Some(focused);
                focused
            }
        }
    }
}
