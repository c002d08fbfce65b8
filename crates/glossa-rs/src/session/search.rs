//! In-document replacement over search results.
//!
//! The search view lets the operator rewrite every token matching a field
//! query. A query compares token fields in a significant order —
//! normalization, lemma, morphology, transcript — and a replacement writes
//! the first three, keeping the hidden full-lemma / full-morphology fields
//! consistent with whatever changed.

use crate::document::token::TokenFields;
use crate::document::tree::DocumentTree;

/// The token fields a query or replacement can address, in match order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceField {
    Normalization,
    Lemma,
    Morphology,
    Transcript,
}

/// A snapshot of one token's replaceable field values, used to prefill the
/// replace form from a clicked token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    pub normalization: Option<String>,
    pub lemma: Option<String>,
    pub morphology: Option<String>,
    pub transcript: Option<String>,
}

impl FieldValues {
    /// Snapshot a token's current values.
    pub fn of(fields: &TokenFields) -> Self {
        let ann = fields.annotation.as_ref();
        Self {
            normalization: ann.map(|a| a.normalization.clone()),
            lemma: ann.map(|a| a.lemma.clone()),
            morphology: ann.map(|a| a.morphology.clone()),
            transcript: Some(fields.transcript.clone()),
        }
    }
}

/// An ordered conjunction of field equality checks. An empty query matches
/// every token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceQuery(pub Vec<(ReplaceField, String)>);

impl ReplaceQuery {
    /// Build a query from form values, skipping empty fields. Field order
    /// is significant and fixed: normalization, lemma, morphology,
    /// transcript.
    pub fn from_values(values: &FieldValues) -> Self {
        let mut query = Vec::new();
        let pairs = [
            (ReplaceField::Normalization, &values.normalization),
            (ReplaceField::Lemma, &values.lemma),
            (ReplaceField::Morphology, &values.morphology),
            (ReplaceField::Transcript, &values.transcript),
        ];
        for (field, value) in pairs {
            if let Some(v) = value
                && !v.is_empty()
            {
                query.push((field, v.clone()));
            }
        }
        Self(query)
    }

    /// Whether a token matches every check. A check against an annotation
    /// field never matches an unannotated token.
    pub fn matches(&self, fields: &TokenFields) -> bool {
        self.0.iter().all(|(field, value)| {
            let actual = match field {
                ReplaceField::Transcript => Some(fields.transcript.as_str()),
                ReplaceField::Normalization => {
                    fields.annotation.as_ref().map(|a| a.normalization.as_str())
                }
                ReplaceField::Lemma => fields.annotation.as_ref().map(|a| a.lemma.as_str()),
                ReplaceField::Morphology => {
                    fields.annotation.as_ref().map(|a| a.morphology.as_str())
                }
            };
            actual == Some(value.as_str())
        })
    }
}

/// Replacement values for matched tokens. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacement {
    pub normalization: Option<String>,
    pub lemma: Option<String>,
    pub morphology: Option<String>,
}

impl Replacement {
    pub fn is_empty(&self) -> bool {
        self.normalization.is_none() && self.lemma.is_none() && self.morphology.is_none()
    }

    /// Apply to one token. The fields are written in order — normalization,
    /// lemma, morphology — and the hidden full fields follow: a new lemma
    /// rewrites the full lemma and re-derives the full morphology from the
    /// token's (possibly just-replaced) morphology; a new morphology
    /// re-derives the full morphology from the current lemma.
    ///
    /// Tokens without an annotation are untouched. Returns whether anything
    /// was written.
    pub fn apply(&self, fields: &mut TokenFields) -> bool {
        let Some(ann) = fields.annotation.as_mut() else {
            return false;
        };
        let mut changed = false;

        if let Some(v) = &self.normalization {
            ann.normalization = v.clone();
            changed = true;
        }
        if let Some(v) = &self.lemma {
            ann.lemma = v.clone();
            ann.lemma_full = v.clone();
            ann.morphology_full = format!("{v}-{}", ann.morphology);
            changed = true;
        }
        if let Some(v) = &self.morphology {
            ann.morphology = v.clone();
            ann.morphology_full = format!("{}-{v}", ann.lemma);
            changed = true;
        }
        changed
    }
}

/// Apply a replacement to every matching token of the document. Returns the
/// number of tokens written.
pub fn replace_all(
    tree: &mut DocumentTree,
    query: &ReplaceQuery,
    replacement: &Replacement,
) -> usize {
    if replacement.is_empty() {
        return 0;
    }
    let mut written = 0;
    for id in tree.tokens() {
        let Some(fields) = tree.token_mut(id) else {
            continue;
        };
        if query.matches(fields) && replacement.apply(fields) {
            written += 1;
        }
    }
    written
}
