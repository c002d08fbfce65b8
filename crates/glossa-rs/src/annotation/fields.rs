//! Dependency-driven activation and ordering of annotation-form fields.
//!
//! Every optional field — a per-category selector or a facultative
//! checkbox — carries a dependency expression over selector tags. On each
//! selection change the [`FieldActivationEngine`] recomputes which fields
//! are active, resets the ones that are not, and derives the display order
//! of the active fields from the [`OrderingConfig`].

use super::ordering::OrderingConfig;
use super::tags::{TagRef, TagSelection};
use std::collections::BTreeSet;
use tracing::trace;

/// What kind of control a field is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A single-choice selector for one category.
    Selector,
    /// A facultative checkbox carrying one tag.
    Checkbox,
}

/// Dependency expression of a field.
///
/// `AnyOf` is a disjunction of conjunctions: the field is active when any
/// alternative has all of its tags chosen. A field with no alternatives is
/// never active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyExpr {
    /// Always active.
    Wildcard,
    AnyOf(Vec<Vec<TagRef>>),
}

impl DependencyExpr {
    /// Whether the expression is satisfied by the current selection.
    pub fn satisfied_by(&self, selection: &TagSelection) -> bool {
        match self {
            DependencyExpr::Wildcard => true,
            DependencyExpr::AnyOf(alternatives) => alternatives
                .iter()
                .any(|conj| conj.iter().all(|r| selection.contains_ref(r))),
        }
    }
}

/// A form field: its id, control kind, and dependency expression.
///
/// Selector ids are category names; checkbox ids are the facultative tag
/// they carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub id: String,
    pub kind: FieldKind,
    pub deps: DependencyExpr,
}

/// Result of one activation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activation {
    /// Ids of the currently active fields.
    pub active: BTreeSet<String>,
    /// Display order: the primary category first, then the categories of
    /// the winning ordering rule. Active fields outside this list have no
    /// stable order guarantee.
    pub order: Vec<String>,
    /// Ids of fields that were reset because they went inactive.
    pub cleared: Vec<String>,
}

/// Computes active fields and their order from a selection and the static
/// per-session configuration. The descriptor list and ordering table are
/// loaded once per view and never change afterwards.
#[derive(Debug, Clone)]
pub struct FieldActivationEngine {
    descriptors: Vec<FieldDescriptor>,
    ordering: OrderingConfig,
    primary: String,
}

impl FieldActivationEngine {
    pub fn new(
        descriptors: Vec<FieldDescriptor>,
        ordering: OrderingConfig,
        primary: impl Into<String>,
    ) -> Self {
        Self {
            descriptors,
            ordering,
            primary: primary.into(),
        }
    }

    /// The designated primary category.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// The configured field descriptors, in declared order.
    pub fn descriptors(&self) -> &[FieldDescriptor] {
        &self.descriptors
    }

    /// Recompute activation for the current selection.
    ///
    /// Fields whose dependencies are not satisfied are reset in the
    /// selection (selector choice cleared, checkbox unchecked) — an
    /// observable side effect reported in [`Activation::cleared`]. Must be
    /// re-run on every selection change.
    pub fn activate(&self, selection: &mut TagSelection) -> Activation {
        let mut result = Activation::default();

        for descriptor in &self.descriptors {
            if descriptor.deps.satisfied_by(selection) {
                result.active.insert(descriptor.id.clone());
                continue;
            }
            match descriptor.kind {
                FieldKind::Selector => {
                    if selection.tag_for(&descriptor.id).is_some() {
                        selection.clear_category(&descriptor.id);
                        result.cleared.push(descriptor.id.clone());
                    }
                }
                FieldKind::Checkbox => {
                    if selection.is_checked(&descriptor.id) {
                        selection.uncheck(&descriptor.id);
                        result.cleared.push(descriptor.id.clone());
                    }
                }
            }
        }

        // A reset can invalidate dependencies of later fields; settle by
        // re-running until no further field drops out.
        loop {
            let mut dropped = Vec::new();
            for descriptor in &self.descriptors {
                if result.active.contains(&descriptor.id)
                    && !descriptor.deps.satisfied_by(selection)
                {
                    dropped.push(descriptor.clone());
                }
            }
            if dropped.is_empty() {
                break;
            }
            for descriptor in dropped {
                result.active.remove(&descriptor.id);
                match descriptor.kind {
                    FieldKind::Selector => selection.clear_category(&descriptor.id),
                    FieldKind::Checkbox => selection.uncheck(&descriptor.id),
                }
                result.cleared.push(descriptor.id);
            }
        }

        if let Some(primary_tag) = selection.tag_for(&self.primary) {
            result.order.push(self.primary.clone());
            if let Some(categories) = self.ordering.resolve(primary_tag, &selection.refs()) {
                result.order.extend(categories.iter().cloned());
            }
        }

        trace!(
            "activation: {} active, {} cleared, order {:?}",
            result.active.len(),
            result.cleared.len(),
            result.order
        );
        result
    }
}
