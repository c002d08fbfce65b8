//! Display-ordering rules for the annotation form.
//!
//! Each tag of the primary category (typically a part of speech) maps to a
//! prioritized list of rules. A rule pairs a required tag set with an
//! ordered category list; the first rule (in declared order) whose required
//! set is a subset of the current selection wins, falling back to the
//! tag's `default` rule.

use super::tags::TagRef;
use std::collections::{BTreeMap, BTreeSet};

/// One ordering rule: require these tags, order categories like this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRule {
    pub required: BTreeSet<TagRef>,
    pub categories: Vec<String>,
}

/// The rules for one primary tag: ranked specific rules plus a fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryRules {
    /// Specific rules, in declared priority order.
    pub ranked: Vec<OrderRule>,
    /// The `default` category list, used when no ranked rule matches.
    pub default: Vec<String>,
}

/// Mapping from a primary category's tag value to its ordering rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderingConfig {
    rules: BTreeMap<String, PrimaryRules>,
}

impl OrderingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the rules for a primary tag, replacing any existing entry.
    pub fn insert(&mut self, primary_tag: impl Into<String>, rules: PrimaryRules) {
        self.rules.insert(primary_tag.into(), rules);
    }

    /// The rules registered for `primary_tag`, if any.
    pub fn rules_for(&self, primary_tag: &str) -> Option<&PrimaryRules> {
        self.rules.get(primary_tag)
    }

    /// Iterate all (primary tag, rules) entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PrimaryRules)> {
        self.rules.iter().map(|(tag, rules)| (tag.as_str(), rules))
    }

    /// Resolve the ordered category list for `primary_tag` given the tags
    /// currently present in the selection. Returns `None` when the primary
    /// tag has no registered rules at all.
    pub fn resolve(&self, primary_tag: &str, present: &BTreeSet<TagRef>) -> Option<&[String]> {
        let rules = self.rules.get(primary_tag)?;
        for rule in &rules.ranked {
            if rule.required.is_subset(present) {
                return Some(&rule.categories);
            }
        }
        Some(&rules.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(pairs: &[(&str, &str)]) -> BTreeSet<TagRef> {
        pairs.iter().map(|(c, t)| TagRef::new(*c, *t)).collect()
    }

    fn rule(pairs: &[(&str, &str)], categories: &[&str]) -> OrderRule {
        OrderRule {
            required: refs(pairs),
            categories: categories.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// The specificity fixture from the ordering contract: rules
    /// `{"A,B": [x,y], "A": [y,x], "default": [x]}`.
    fn config() -> OrderingConfig {
        let mut ordering = OrderingConfig::new();
        ordering.insert(
            "NOUN",
            PrimaryRules {
                ranked: vec![
                    rule(&[("cat", "A"), ("cat2", "B")], &["x", "y"]),
                    rule(&[("cat", "A")], &["y", "x"]),
                ],
                default: vec!["x".into()],
            },
        );
        ordering
    }

    #[test]
    fn most_specific_rule_wins() {
        let ordering = config();
        let present = refs(&[("cat", "A"), ("cat2", "B")]);
        assert_eq!(
            ordering.resolve("NOUN", &present).unwrap(),
            &["x".to_string(), "y".to_string()]
        );
    }

    #[test]
    fn partial_match_falls_to_next_rule() {
        let ordering = config();
        let present = refs(&[("cat", "A")]);
        assert_eq!(
            ordering.resolve("NOUN", &present).unwrap(),
            &["y".to_string(), "x".to_string()]
        );
    }

    #[test]
    fn no_match_uses_default() {
        let ordering = config();
        assert_eq!(
            ordering.resolve("NOUN", &BTreeSet::new()).unwrap(),
            &["x".to_string()]
        );
    }

    #[test]
    fn extra_present_tags_do_not_block_a_rule() {
        let ordering = config();
        let present = refs(&[("cat", "A"), ("cat2", "B"), ("cat3", "C")]);
        // Subset check, not equality.
        assert_eq!(
            ordering.resolve("NOUN", &present).unwrap(),
            &["x".to_string(), "y".to_string()]
        );
    }

    #[test]
    fn unknown_primary_tag_has_no_rules() {
        let ordering = config();
        assert!(ordering.resolve("VERB", &BTreeSet::new()).is_none());
    }
}
