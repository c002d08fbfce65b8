//! The manual annotation form.
//!
//! When the operator picks a candidate, the form resets, takes over the
//! candidate's lemma and the current normalization, and re-selects every
//! tag of the candidate's hyphen-joined morphology string. Confirming
//! composes the final morphology back from the *active* fields only, in
//! field-declaration order — selectors first, then checkboxes.

use super::config::TagCatalog;
use super::fields::{Activation, FieldDescriptor, FieldKind};
use super::tags::TagSelection;
use crate::AnnotationCandidate;
use tracing::debug;

/// Form state for one manual annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationForm {
    pub normalization: String,
    pub lemma: String,
    pub selection: TagSelection,
}

impl AnnotationForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every control.
    pub fn clear(&mut self) {
        self.normalization.clear();
        self.lemma.clear();
        self.selection.clear();
    }

    /// Load a candidate into the form: lemma and normalization inputs, and
    /// one selection entry per tag of the candidate's morphology string.
    /// Tags the catalog does not know are ignored.
    pub fn populate(
        &mut self,
        candidate: &AnnotationCandidate,
        normalization: &str,
        catalog: &TagCatalog,
    ) {
        self.selection.clear();
        self.lemma = candidate.lemma.clone();
        self.normalization = normalization.to_string();

        for tag in split_morphology(&candidate.morphology) {
            if let Some(category) = catalog.category_of(tag) {
                self.selection.choose(category, tag);
            } else if catalog.is_facultative(tag) {
                self.selection.check(tag);
            } else {
                debug!("candidate morphology has unknown tag '{tag}'");
            }
        }
    }

    /// Compose the confirmed morphology string from the active fields:
    /// chosen selector tags in declaration order, then checked facultative
    /// tags, hyphen-joined.
    pub fn compose_morphology(
        &self,
        descriptors: &[FieldDescriptor],
        activation: &Activation,
    ) -> String {
        let mut tags: Vec<&str> = Vec::new();
        for descriptor in descriptors {
            if !activation.active.contains(&descriptor.id) {
                continue;
            }
            match descriptor.kind {
                FieldKind::Selector => {
                    if let Some(tag) = self.selection.tag_for(&descriptor.id) {
                        tags.push(tag);
                    }
                }
                FieldKind::Checkbox => {
                    if self.selection.is_checked(&descriptor.id) {
                        tags.push(&descriptor.id);
                    }
                }
            }
        }
        tags.join("-")
    }
}

/// Split a hyphen-joined morphology string into its tags, dropping empties.
pub fn split_morphology(morphology: &str) -> impl Iterator<Item = &str> {
    morphology.split('-').filter(|t| !t.is_empty())
}
