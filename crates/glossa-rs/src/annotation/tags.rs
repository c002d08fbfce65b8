//! Tags and the operator's current selection.
//!
//! A tag is one chosen value inside a morphological category ("case" →
//! "nom"). Selector categories hold at most one chosen tag; facultative
//! checkboxes are an independent checked set.

use std::collections::{BTreeMap, BTreeSet};

/// A `category:tag` pair — the unit dependency expressions and ordering
/// rules are written in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagRef {
    pub category: String,
    pub tag: String,
}

impl TagRef {
    pub fn new(category: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            tag: tag.into(),
        }
    }

    /// Parse the `category:tag` notation used by ordering-rule keys.
    pub fn parse(raw: &str) -> Option<Self> {
        let (category, tag) = raw.split_once(':')?;
        let (category, tag) = (category.trim(), tag.trim());
        if category.is_empty() || tag.is_empty() {
            return None;
        }
        Some(Self::new(category, tag))
    }
}

impl std::fmt::Display for TagRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.category, self.tag)
    }
}

/// The full set of currently chosen tags across categories, plus the
/// checked facultative tags. Rebuilt or mutated whenever the operator
/// changes a form control; keys are unique per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSelection {
    chosen: BTreeMap<String, String>,
    checked: BTreeSet<String>,
}

impl TagSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose `tag` for `category`, replacing any previous choice.
    pub fn choose(&mut self, category: impl Into<String>, tag: impl Into<String>) {
        self.chosen.insert(category.into(), tag.into());
    }

    /// Clear the choice for `category`.
    pub fn clear_category(&mut self, category: &str) {
        self.chosen.remove(category);
    }

    pub fn check(&mut self, tag: impl Into<String>) {
        self.checked.insert(tag.into());
    }

    pub fn uncheck(&mut self, tag: &str) {
        self.checked.remove(tag);
    }

    pub fn clear(&mut self) {
        self.chosen.clear();
        self.checked.clear();
    }

    /// The chosen tag for `category`, if any.
    pub fn tag_for(&self, category: &str) -> Option<&str> {
        self.chosen.get(category).map(String::as_str)
    }

    pub fn is_checked(&self, tag: &str) -> bool {
        self.checked.contains(tag)
    }

    /// Whether `r`'s tag is the current choice in `r`'s category.
    pub fn contains_ref(&self, r: &TagRef) -> bool {
        self.tag_for(&r.category) == Some(r.tag.as_str())
    }

    /// All chosen pairs as refs — the keyset ordering rules are matched
    /// against.
    pub fn refs(&self) -> BTreeSet<TagRef> {
        self.chosen
            .iter()
            .map(|(category, tag)| TagRef::new(category, tag))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty() && self.checked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_splits_once() {
        let r = TagRef::parse(" case : nom ").unwrap();
        assert_eq!(r.category, "case");
        assert_eq!(r.tag, "nom");
        assert_eq!(r.to_string(), "case:nom");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(TagRef::parse("case").is_none());
        assert!(TagRef::parse(":nom").is_none());
        assert!(TagRef::parse("case:").is_none());
    }

    #[test]
    fn choose_replaces_within_category() {
        let mut sel = TagSelection::new();
        sel.choose("case", "nom");
        sel.choose("case", "dat");
        assert_eq!(sel.tag_for("case"), Some("dat"));
        assert!(sel.contains_ref(&TagRef::new("case", "dat")));
        assert!(!sel.contains_ref(&TagRef::new("case", "nom")));
    }

    #[test]
    fn refs_reflect_all_chosen_pairs() {
        let mut sel = TagSelection::new();
        sel.choose("case", "nom");
        sel.choose("number", "sg");
        sel.check("arch");

        let refs = sel.refs();
        assert!(refs.contains(&TagRef::new("case", "nom")));
        assert!(refs.contains(&TagRef::new("number", "sg")));
        // Checked facultative tags are not category choices.
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn clear_resets_everything() {
        let mut sel = TagSelection::new();
        sel.choose("case", "nom");
        sel.check("arch");
        sel.clear();
        assert!(sel.is_empty());
        assert!(!sel.is_checked("arch"));
    }
}
