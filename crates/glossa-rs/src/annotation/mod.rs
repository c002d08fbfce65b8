//! Annotation-form model: tags, dependency-driven field activation,
//! ordering rules, and the menu configuration they are loaded from.
//!
//! - [`tags`] — [`TagRef`](tags::TagRef) category/tag pairs and the
//!   operator's current [`TagSelection`](tags::TagSelection).
//! - [`fields`] — [`FieldDescriptor`](fields::FieldDescriptor) dependency
//!   expressions and the [`FieldActivationEngine`](fields::FieldActivationEngine)
//!   computing the active set and display order.
//! - [`ordering`] — [`OrderingConfig`](ordering::OrderingConfig):
//!   primary-tag → prioritized subset rules, resolved first-match.
//! - [`config`] — [`MenuConfig`](config::MenuConfig) JSON loading with
//!   schema validation, and the table build that produces descriptors and
//!   ordering rules.
//! - [`form`] — the manual [`AnnotationForm`](form::AnnotationForm):
//!   populate from a candidate, compose the final morphology string.

pub mod config;
pub mod fields;
pub mod form;
pub mod ordering;
pub mod tags;

// Re-export commonly used items at the module level.
pub use config::MenuConfig;
pub use fields::{Activation, DependencyExpr, FieldActivationEngine, FieldDescriptor, FieldKind};
pub use form::AnnotationForm;
pub use ordering::{OrderRule, OrderingConfig};
pub use tags::{TagRef, TagSelection};
