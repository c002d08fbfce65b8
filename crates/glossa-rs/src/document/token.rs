//! Token derived fields and the atomic annotation commit.
//!
//! A token owns its transcript plus an optional [`TokenAnnotation`] holding
//! normalization, lemma, and morphology together. The annotation is always
//! replaced as one value — there is no way to half-apply one, which is what
//! makes a failed save leave the prior fields intact.

use crate::AnnotationCandidate;

/// The fields attached to one token of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenFields {
    /// The transcribed surface form. Set at render time, never rewritten
    /// by the annotation flow.
    pub transcript: String,
    /// The committed annotation, if any.
    pub annotation: Option<TokenAnnotation>,
}

impl TokenFields {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            annotation: None,
        }
    }

    /// Commit an annotation. Single assignment — all fields land together.
    pub fn apply(&mut self, annotation: TokenAnnotation) {
        self.annotation = Some(annotation);
    }

    /// The committed normalization, if any.
    pub fn normalization(&self) -> Option<&str> {
        self.annotation.as_ref().map(|a| a.normalization.as_str())
    }
}

/// One complete annotation for a token.
///
/// The visible lemma/morphology pair is backed by two hidden "full" fields
/// carrying every candidate reading, kept consistent by the constructors
/// and by [`search`](crate::session::search) replacements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAnnotation {
    pub normalization: String,
    pub lemma: String,
    /// All distinct candidate lemmas, `/`-joined.
    pub lemma_full: String,
    pub morphology: String,
    /// Every candidate reading as `lemma-morphology`, `/`-joined.
    pub morphology_full: String,
}

impl TokenAnnotation {
    /// Build an annotation from operator-confirmed form values.
    pub fn confirmed(
        normalization: impl Into<String>,
        lemma: impl Into<String>,
        morphology: impl Into<String>,
    ) -> Self {
        let lemma = lemma.into();
        let morphology = morphology.into();
        Self {
            normalization: normalization.into(),
            lemma_full: lemma.clone(),
            morphology_full: format!("{lemma}-{morphology}"),
            lemma,
            morphology,
        }
    }

    /// Build an annotation from a backend candidate list, taking the first
    /// candidate as the visible reading and folding the rest into the full
    /// fields. Returns `None` for an empty list.
    pub fn from_candidates(
        normalization: impl Into<String>,
        candidates: &[AnnotationCandidate],
    ) -> Option<Self> {
        let first = candidates.first()?;

        let morphology_full = candidates
            .iter()
            .map(|c| format!("{}-{}", c.lemma, c.morphology))
            .collect::<Vec<_>>()
            .join("/");

        let mut lemmas: Vec<&str> = Vec::new();
        for c in candidates {
            if !lemmas.contains(&c.lemma.as_str()) {
                lemmas.push(&c.lemma);
            }
        }
        let lemma_full = lemmas.join("/");

        Some(Self {
            normalization: normalization.into(),
            lemma: first.lemma.clone(),
            lemma_full,
            morphology: first.morphology.clone(),
            morphology_full,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(lemma: &str, morphology: &str) -> AnnotationCandidate {
        AnnotationCandidate {
            lemma: lemma.into(),
            morphology: morphology.into(),
        }
    }

    #[test]
    fn confirmed_derives_full_fields() {
        let ann = TokenAnnotation::confirmed("дому", "дом", "NOUN-dat-sg");
        assert_eq!(ann.lemma_full, "дом");
        assert_eq!(ann.morphology_full, "дом-NOUN-dat-sg");
    }

    #[test]
    fn from_candidates_takes_first_reading() {
        let ann = TokenAnnotation::from_candidates(
            "дому",
            &[candidate("дом", "NOUN-dat-sg"), candidate("дом", "NOUN-loc-sg")],
        )
        .unwrap();
        assert_eq!(ann.lemma, "дом");
        assert_eq!(ann.morphology, "NOUN-dat-sg");
        assert_eq!(ann.morphology_full, "дом-NOUN-dat-sg/дом-NOUN-loc-sg");
    }

    #[test]
    fn from_candidates_deduplicates_lemmas_in_order() {
        let ann = TokenAnnotation::from_candidates(
            "три",
            &[
                candidate("три", "NUM-nom"),
                candidate("тереть", "VERB-imp"),
                candidate("три", "NUM-acc"),
            ],
        )
        .unwrap();
        assert_eq!(ann.lemma_full, "три/тереть");
    }

    #[test]
    fn from_candidates_empty_is_none() {
        assert!(TokenAnnotation::from_candidates("x", &[]).is_none());
    }

    #[test]
    fn apply_replaces_whole_annotation() {
        let mut fields = TokenFields::new("domu");
        fields.apply(TokenAnnotation::confirmed("дому", "дом", "NOUN-dat-sg"));
        fields.apply(TokenAnnotation::confirmed("дому", "дом", "NOUN-loc-sg"));

        let ann = fields.annotation.unwrap();
        assert_eq!(ann.morphology, "NOUN-loc-sg");
        assert_eq!(ann.morphology_full, "дом-NOUN-loc-sg");
    }
}
