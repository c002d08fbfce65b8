//! Arena-backed document tree.
//!
//! The rendered document is a hierarchy: a root holding utterances, each
//! utterance holding the tokens spoken in it (deeper grouping nodes are
//! allowed — traversal does not assume a fixed depth). Nodes are stored in
//! an arena and addressed by [`NodeId`], so the tree hands out cheap copyable
//! handles instead of references.

use super::token::TokenFields;
use super::traversal::OrderedTree;

/// Handle to a node in a [`DocumentTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document root.
    Document,
    /// A grouping node — one annotated utterance, optionally carrying the
    /// dialect its tokens should be looked up under.
    Utterance { dialect: Option<String> },
    /// A token and its derived fields.
    Token(TokenFields),
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The annotated document structure.
#[derive(Debug)]
pub struct DocumentTree {
    nodes: Vec<Node>,
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTree {
    /// Create a tree holding only the document root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a child node under `parent`, returning its handle.
    pub fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append an utterance under `parent`.
    pub fn push_utterance(&mut self, parent: NodeId, dialect: Option<String>) -> NodeId {
        self.push(parent, NodeKind::Utterance { dialect })
    }

    /// Append a token under `parent`.
    pub fn push_token(&mut self, parent: NodeId, transcript: impl Into<String>) -> NodeId {
        self.push(parent, NodeKind::Token(TokenFields::new(transcript)))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// The sibling immediately after `id`, if any.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes[id.0].parent?;
        let siblings = &self.nodes[parent.0].children;
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// The sibling immediately before `id`, if any.
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes[id.0].parent?;
        let siblings = &self.nodes[parent.0].children;
        let pos = siblings.iter().position(|&c| c == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    pub fn is_token(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Token(_))
    }

    pub fn token(&self, id: NodeId) -> Option<&TokenFields> {
        match &self.nodes[id.0].kind {
            NodeKind::Token(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn token_mut(&mut self, id: NodeId) -> Option<&mut TokenFields> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Token(fields) => Some(fields),
            _ => None,
        }
    }

    /// The adjacent left sibling, if it is a token. Focus-range growth uses
    /// strict adjacency — a non-token neighbour stops the extension.
    pub fn left_token_neighbor(&self, id: NodeId) -> Option<NodeId> {
        self.prev_sibling(id).filter(|&s| self.is_token(s))
    }

    /// The adjacent right sibling, if it is a token.
    pub fn right_token_neighbor(&self, id: NodeId) -> Option<NodeId> {
        self.next_sibling(id).filter(|&s| self.is_token(s))
    }

    /// The dialect in effect at `id`: the nearest enclosing utterance's.
    pub fn dialect_of(&self, id: NodeId) -> Option<&str> {
        let mut cur = Some(id);
        while let Some(node) = cur {
            if let NodeKind::Utterance {
                dialect: Some(dialect),
            } = &self.nodes[node.0].kind
            {
                return Some(dialect);
            }
            cur = self.nodes[node.0].parent;
        }
        None
    }

    /// All token nodes in document order.
    pub fn tokens(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            if self.is_token(id) {
                out.push(id);
            }
            for &child in self.children(id).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Serialize the document for a save-document request: one line per
    /// utterance, tokens as `transcript` or
    /// `transcript[normalization|lemma|morphology]` once annotated.
    pub fn export_markup(&self) -> String {
        let mut lines = Vec::new();
        for &utterance in self.children(self.root()) {
            let mut words = Vec::new();
            let mut stack: Vec<NodeId> = self.children(utterance).iter().rev().copied().collect();
            while let Some(id) = stack.pop() {
                if let Some(fields) = self.token(id) {
                    match &fields.annotation {
                        Some(ann) => words.push(format!(
                            "{}[{}|{}|{}]",
                            fields.transcript, ann.normalization, ann.lemma, ann.morphology
                        )),
                        None => words.push(fields.transcript.clone()),
                    }
                }
                for &child in self.children(id).iter().rev() {
                    stack.push(child);
                }
            }
            lines.push(words.join(" "));
        }
        lines.join("\n")
    }
}

impl OrderedTree for DocumentTree {
    type Id = NodeId;

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        DocumentTree::parent(self, id)
    }

    fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        DocumentTree::next_sibling(self, id)
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        DocumentTree::children(self, id)
    }
}
