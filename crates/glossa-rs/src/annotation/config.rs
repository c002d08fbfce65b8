//! Annotation-menu configuration.
//!
//! One JSON file describes the whole form: the grammeme inventory
//! (`tag → category + surface tag`), the per-primary-tag ordering rules,
//! and the facultative checkboxes. The file is validated against a JSON
//! Schema on load, then normalized into the immutable lookup tables the
//! engine runs on: field descriptors with dependency expressions, the
//! ordering table, and the surface-tag catalog.
//!
//! Rule keys use `category:tag` notation, comma-separated:
//!
//! ```json
//! {
//!   "primary": "part of speech",
//!   "grammemes": {
//!     "noun":       { "category": "part of speech", "surface_tag": "NOUN" },
//!     "nominative": { "category": "case", "surface_tag": "nom" }
//!   },
//!   "order": {
//!     "NOUN": {
//!       "case:nom, number:sg": ["case", "number"],
//!       "default": ["case"]
//!     }
//!   },
//!   "facultative": {
//!     "arch": { "label": "Archaic", "depends_on": "*" }
//!   }
//! }
//! ```

use super::fields::{DependencyExpr, FieldActivationEngine, FieldDescriptor, FieldKind};
use super::ordering::{OrderRule, OrderingConfig, PrimaryRules};
use super::tags::TagRef;
use crate::json_schema_for;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::warn;

/// Marker for an always-satisfied dependency.
pub const WILDCARD: &str = "*";

/// The fallback primary category when the config names none.
pub const DEFAULT_PRIMARY: &str = "part of speech";

/// One grammeme: the category it belongs to and the tag written into
/// morphology strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GrammemeEntry {
    pub category: String,
    pub surface_tag: String,
}

/// One facultative checkbox: its label and the tags that activate it
/// (`"*"` for always, else a comma-separated surface-tag list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FacultativeEntry {
    pub label: String,
    pub depends_on: String,
}

/// Surface-tag lookups needed when a morphology string is parsed back into
/// a form selection.
#[derive(Debug, Clone, Default)]
pub struct TagCatalog {
    by_surface: BTreeMap<String, String>,
    facultative: BTreeSet<String>,
}

impl TagCatalog {
    /// The category a surface tag belongs to.
    pub fn category_of(&self, surface_tag: &str) -> Option<&str> {
        self.by_surface.get(surface_tag).map(String::as_str)
    }

    /// Whether a tag is a facultative checkbox rather than a selector value.
    pub fn is_facultative(&self, tag: &str) -> bool {
        self.facultative.contains(tag)
    }
}

/// Parsed and validated menu configuration. Loaded once per document view
/// and treated as immutable for the whole session.
#[derive(Debug, Clone)]
pub struct MenuConfig {
    primary: String,
    /// Grammemes in declaration order.
    grammemes: Vec<(String, GrammemeEntry)>,
    /// `primary tag → [(rule key, category list)]`, both in declared order.
    order: Vec<(String, Vec<(String, Vec<String>)>)>,
    /// Facultative checkboxes in declaration order.
    facultative: Vec<(String, FacultativeEntry)>,
}

impl MenuConfig {
    /// Load and validate a config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, String> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("failed to read menu config: {e}"))?;
        Self::from_str(&text)
    }

    /// Parse and validate a config from JSON text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Result<Self, String> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| format!("menu config is not JSON: {e}"))?;
        Self::from_value(&value)
    }

    /// Validate a raw JSON value against the schema and normalize it.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, String> {
        validate_against_schema(value)?;

        let primary = value
            .get("primary")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(DEFAULT_PRIMARY)
            .to_string();

        let mut grammemes = Vec::new();
        if let Some(map) = value.get("grammemes").and_then(serde_json::Value::as_object) {
            for (tag, entry) in map {
                let entry: GrammemeEntry = serde_json::from_value(entry.clone())
                    .map_err(|e| format!("grammeme '{tag}': {e}"))?;
                grammemes.push((tag.clone(), entry));
            }
        }

        let mut order = Vec::new();
        if let Some(map) = value.get("order").and_then(serde_json::Value::as_object) {
            for (primary_tag, rules_value) in map {
                let rules_map = rules_value
                    .as_object()
                    .ok_or_else(|| format!("order rules for '{primary_tag}' must be an object"))?;
                let mut rules = Vec::new();
                for (key, categories_value) in rules_map {
                    let categories: Vec<String> =
                        serde_json::from_value(categories_value.clone()).map_err(|e| {
                            format!("order rule '{primary_tag}' / '{key}': {e}")
                        })?;
                    rules.push((key.clone(), categories));
                }
                order.push((primary_tag.clone(), rules));
            }
        }

        let mut facultative = Vec::new();
        if let Some(map) = value
            .get("facultative")
            .and_then(serde_json::Value::as_object)
        {
            for (tag, entry) in map {
                let entry: FacultativeEntry = serde_json::from_value(entry.clone())
                    .map_err(|e| format!("facultative '{tag}': {e}"))?;
                facultative.push((tag.clone(), entry));
            }
        }

        Ok(Self {
            primary,
            grammemes,
            order,
            facultative,
        })
    }

    /// The designated primary category.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Selector categories in declaration order (first grammeme mention).
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for (_, entry) in &self.grammemes {
            if seen.insert(entry.category.as_str()) {
                out.push(entry.category.as_str());
            }
        }
        out
    }

    /// Surface tags of a category, in declaration order.
    pub fn tags_for(&self, category: &str) -> Vec<&str> {
        self.grammemes
            .iter()
            .filter(|(_, e)| e.category == category)
            .map(|(_, e)| e.surface_tag.as_str())
            .collect()
    }

    /// Build the surface-tag catalog.
    pub fn catalog(&self) -> TagCatalog {
        TagCatalog {
            by_surface: self
                .grammemes
                .iter()
                .map(|(_, e)| (e.surface_tag.clone(), e.category.clone()))
                .collect(),
            facultative: self.facultative.iter().map(|(tag, _)| tag.clone()).collect(),
        }
    }

    /// Build the ordering table: ranked rules in declared priority order
    /// plus the `default` fallback, per primary tag.
    pub fn ordering(&self) -> Result<OrderingConfig, String> {
        let mut ordering = OrderingConfig::new();
        for (primary_tag, rules) in &self.order {
            let mut primary_rules = PrimaryRules::default();
            for (key, categories) in rules {
                if key == "default" {
                    primary_rules.default = categories.clone();
                    continue;
                }
                primary_rules.ranked.push(OrderRule {
                    required: parse_rule_key(primary_tag, key)?,
                    categories: categories.clone(),
                });
            }
            ordering.insert(primary_tag.clone(), primary_rules);
        }
        Ok(ordering)
    }

    /// Build the field descriptors: one selector per category (the primary
    /// category is wildcard-active; the others derive one conjunction per
    /// ordering rule that lists them) and one checkbox per facultative tag.
    pub fn descriptors(&self) -> Result<Vec<FieldDescriptor>, String> {
        let catalog = self.catalog();

        // Conjunctions per category, collected from the ordering rules.
        let mut alternatives: BTreeMap<&str, Vec<Vec<TagRef>>> = BTreeMap::new();
        for (primary_tag, rules) in &self.order {
            for (key, categories) in rules {
                let mut conj = vec![TagRef::new(&self.primary, primary_tag)];
                if key != "default" {
                    conj.extend(parse_rule_key(primary_tag, key)?);
                }
                for category in categories {
                    alternatives
                        .entry(category.as_str())
                        .or_default()
                        .push(conj.clone());
                }
            }
        }

        let mut descriptors = Vec::new();
        for category in self.categories() {
            let deps = if category == self.primary {
                DependencyExpr::Wildcard
            } else {
                DependencyExpr::AnyOf(alternatives.remove(category).unwrap_or_default())
            };
            descriptors.push(FieldDescriptor {
                id: category.to_string(),
                kind: FieldKind::Selector,
                deps,
            });
        }

        for (tag, entry) in &self.facultative {
            let deps = if entry.depends_on.trim() == WILDCARD {
                DependencyExpr::Wildcard
            } else {
                let mut alts = Vec::new();
                for part in entry.depends_on.split(',') {
                    let surface = part.trim();
                    if surface.is_empty() {
                        continue;
                    }
                    match catalog.category_of(surface) {
                        Some(category) => alts.push(vec![TagRef::new(category, surface)]),
                        None => {
                            // An unknown tag can never be chosen, so the
                            // alternative is dropped rather than kept dead.
                            warn!("facultative '{tag}' references unknown tag '{surface}'");
                        }
                    }
                }
                DependencyExpr::AnyOf(alts)
            };
            descriptors.push(FieldDescriptor {
                id: tag.clone(),
                kind: FieldKind::Checkbox,
                deps,
            });
        }

        Ok(descriptors)
    }

    /// Build the activation engine from this config.
    pub fn engine(&self) -> Result<FieldActivationEngine, String> {
        Ok(FieldActivationEngine::new(
            self.descriptors()?,
            self.ordering()?,
            self.primary.clone(),
        ))
    }
}

/// Parse a comma-separated `category:tag` rule key.
fn parse_rule_key(primary_tag: &str, key: &str) -> Result<BTreeSet<TagRef>, String> {
    let mut refs = BTreeSet::new();
    for part in key.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let r = TagRef::parse(part).ok_or_else(|| {
            format!("order rule '{primary_tag}' / '{key}': bad tag ref '{part}'")
        })?;
        refs.insert(r);
    }
    Ok(refs)
}

/// The schema every config file must satisfy.
fn config_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "required": ["grammemes", "order"],
        "properties": {
            "primary": { "type": "string" },
            "grammemes": {
                "type": "object",
                "additionalProperties": json_schema_for::<GrammemeEntry>()
            },
            "order": {
                "type": "object",
                "additionalProperties": {
                    "type": "object",
                    "additionalProperties": {
                        "type": "array",
                        "items": { "type": "string" }
                    }
                }
            },
            "facultative": {
                "type": "object",
                "additionalProperties": json_schema_for::<FacultativeEntry>()
            }
        }
    })
}

/// Validate a raw config value, formatting every violation.
fn validate_against_schema(value: &serde_json::Value) -> Result<(), String> {
    let schema = config_schema();
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => return Err(format!("menu config schema is invalid: {e}")),
    };

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("  - {}: {e}", e.instance_path()))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!("menu config is invalid:\n{}", errors.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::tags::TagSelection;
    use std::io::Write;

    fn sample() -> serde_json::Value {
        serde_json::json!({
            "grammemes": {
                "noun":       { "category": "part of speech", "surface_tag": "NOUN" },
                "verb":       { "category": "part of speech", "surface_tag": "VERB" },
                "nominative": { "category": "case", "surface_tag": "nom" },
                "accusative": { "category": "case", "surface_tag": "acc" },
                "singular":   { "category": "number", "surface_tag": "sg" },
                "feminine":   { "category": "gender", "surface_tag": "f" }
            },
            "order": {
                "NOUN": {
                    "number:sg":  ["case", "number", "gender"],
                    "case:acc":   ["case", "number"],
                    "default":    ["case"]
                }
            },
            "facultative": {
                "arch": { "label": "Archaic",  "depends_on": "*" },
                "dial": { "label": "Dialectal", "depends_on": "NOUN, VERB" },
                "oops": { "label": "Unknown",   "depends_on": "NOPE" }
            }
        })
    }

    #[test]
    fn loads_and_reports_categories_in_declaration_order() {
        let config = MenuConfig::from_value(&sample()).unwrap();
        assert_eq!(config.primary(), "part of speech");
        assert_eq!(
            config.categories(),
            vec!["part of speech", "case", "number", "gender"]
        );
        assert_eq!(config.tags_for("case"), vec!["nom", "acc"]);
    }

    #[test]
    fn rejects_schema_violations() {
        let bad = serde_json::json!({
            "grammemes": { "noun": { "category": "part of speech" } },
            "order": {}
        });
        let err = MenuConfig::from_value(&bad).unwrap_err();
        assert!(err.contains("invalid"), "unexpected error: {err}");
    }

    #[test]
    fn rejects_missing_sections() {
        let err = MenuConfig::from_value(&serde_json::json!({})).unwrap_err();
        assert!(err.contains("invalid"));
    }

    #[test]
    fn ordering_preserves_declared_priority() {
        let config = MenuConfig::from_value(&sample()).unwrap();
        let ordering = config.ordering().unwrap();

        // Both rules match; the first declared ("number:sg") must win even
        // though "case:acc" sorts before it alphabetically.
        let mut selection = TagSelection::new();
        selection.choose("number", "sg");
        selection.choose("case", "acc");
        let resolved = ordering.resolve("NOUN", &selection.refs()).unwrap();
        assert_eq!(resolved, &["case".to_string(), "number".into(), "gender".into()]);
    }

    #[test]
    fn selector_dependencies_derive_from_order_rules() {
        let config = MenuConfig::from_value(&sample()).unwrap();
        let engine = config.engine().unwrap();

        // Choosing the primary tag activates the default-rule categories.
        let mut sel = TagSelection::new();
        sel.choose("part of speech", "NOUN");
        let activation = engine.activate(&mut sel);
        assert!(activation.active.contains("part of speech"));
        assert!(activation.active.contains("case"));
        assert!(!activation.active.contains("number"));

        // number:sg additionally activates gender via the first rule.
        sel.choose("number", "sg");
        let activation = engine.activate(&mut sel);
        assert!(activation.active.contains("gender"));
        assert_eq!(
            activation.order,
            vec![
                "part of speech".to_string(),
                "case".into(),
                "number".into(),
                "gender".into()
            ]
        );
    }

    #[test]
    fn facultative_dependencies() {
        let config = MenuConfig::from_value(&sample()).unwrap();
        let engine = config.engine().unwrap();

        let mut sel = TagSelection::new();
        let activation = engine.activate(&mut sel);
        assert!(activation.active.contains("arch"), "wildcard checkbox");
        assert!(!activation.active.contains("dial"));
        assert!(!activation.active.contains("oops"), "unknown dep never fires");

        sel.choose("part of speech", "VERB");
        let activation = engine.activate(&mut sel);
        assert!(activation.active.contains("dial"));
    }

    #[test]
    fn catalog_maps_surface_tags() {
        let config = MenuConfig::from_value(&sample()).unwrap();
        let catalog = config.catalog();
        assert_eq!(catalog.category_of("nom"), Some("case"));
        assert_eq!(catalog.category_of("NOUN"), Some("part of speech"));
        assert!(catalog.is_facultative("arch"));
        assert!(!catalog.is_facultative("nom"));
    }

    #[test]
    fn bad_rule_key_is_an_error() {
        let mut value = sample();
        value["order"]["NOUN"]["no-colon-here"] = serde_json::json!(["case"]);
        let config = MenuConfig::from_value(&value).unwrap();
        assert!(config.ordering().unwrap_err().contains("bad tag ref"));
    }

    #[test]
    fn from_path_reads_a_real_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", sample()).unwrap();

        let config = MenuConfig::from_path(file.path()).unwrap();
        assert_eq!(config.primary(), "part of speech");
    }

    #[test]
    fn from_path_missing_file_is_an_error() {
        let err = MenuConfig::from_path("/nonexistent/menu.json").unwrap_err();
        assert!(err.contains("failed to read"));
    }
}
