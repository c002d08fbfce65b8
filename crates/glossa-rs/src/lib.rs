//! Client-side engine for a linguistic annotation workbench.
//!
//! `glossa-rs` is the coordination core behind a token-by-token annotation
//! UI: a human operator steps through the tokens of a transcribed document,
//! requests or manually enters a normalization / lemma / morphology
//! annotation for each, and focus advances automatically. The central
//! abstraction is the [`AnnotationSession`](session::AnnotationSession) —
//! a state machine that drives a single-flight request governor, a
//! document-order traversal, and a dependency-driven annotation form.
//!
//! # Getting started
//!
//! ```ignore
//! use glossa_rs::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let backend = HttpBackend::new("https://corpus.example/ajax", "https://corpus.example/ajax_search")?;
//!     let config = MenuConfig::from_path("menu.json")?;
//!
//!     let mut tree = DocumentTree::new();
//!     let utt = tree.push_utterance(tree.root(), Some("northern".into()));
//!     let tok = tree.push_token(utt, "wordform");
//!
//!     let handler = LoggingHandler;
//!     let mut session = AnnotationSession::new(&backend, tree, &config)?
//!         .with_event_handler(&handler);
//!
//!     session.activate_token(tok).await.map_err(|e| e.to_string())?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`transport`] | [`RequestGovernor`](transport::RequestGovernor) single-flight lock, timeout, and bounded conflict retry |
//! | [`document`] | arena document tree, ordered-tree traversal, token fields, focus-range merging |
//! | [`annotation`] | tag selections, field dependency activation, ordering rules, menu config |
//! | [`session`] | the [`AnnotationSession`](session::AnnotationSession) state machine and its events |
//! | [`ui`] | pure page-window builder, icon affordance state, notification capture |
//!
//! # Design principles
//!
//! 1. **One request in flight.** Every backend interaction goes through the
//!    governor; a second submission while one is outstanding is rejected
//!    synchronously, never queued.
//! 2. **Typed dispatch.** Request and response kinds are tagged variants
//!    with typed payloads, resolved by exhaustive matching — no string
//!    comparison chains.
//! 3. **Atomic annotation writes.** Normalization, lemma, and morphology
//!    commit to a token together or not at all.
//! 4. **Observability over magic.** The session reports every transition
//!    through [`SessionEvent`](session::SessionEvent)s; frontends render,
//!    the core decides.

pub mod annotation;
pub mod document;
pub mod prelude;
pub mod session;
pub mod transport;
pub mod ui;

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, trace};

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`. Used to assemble the menu-config schema that
/// config files are validated against on load.
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Request types ──────────────────────────────────────────────────

/// The kind of a backend request. One wire operation per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    LookupAnnotation,
    SuggestAnnotations,
    SaveDocument,
    SaveAnnotation,
    Search,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::LookupAnnotation => write!(f, "lookup_annotation"),
            RequestKind::SuggestAnnotations => write!(f, "suggest_annotations"),
            RequestKind::SaveDocument => write!(f, "save_document"),
            RequestKind::SaveAnnotation => write!(f, "save_annotation"),
            RequestKind::Search => write!(f, "search"),
        }
    }
}

/// Lookup behavior requested by the operator: `Manual` presents candidates
/// for confirmation, `Auto` applies the best candidate and advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMode {
    Manual,
    Auto,
}

/// Which backend surface a request addresses. The document view and the
/// search view are served by different endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestScope {
    Document,
    Search,
}

/// Search form values. Empty fields are omitted from the wire body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub morphology: Option<String>,
    pub start_page: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub return_total_pages: bool,
}

/// Typed request payload, tagged by kind on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestPayload {
    LookupAnnotation {
        transcript: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        normalization: Option<String>,
        mode: LookupMode,
        #[serde(skip_serializing_if = "Option::is_none")]
        dialect: Option<String>,
    },
    SuggestAnnotations {
        transcript: String,
        normalization: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        dialect: Option<String>,
    },
    SaveDocument {
        content: String,
    },
    SaveAnnotation {
        transcript: String,
        normalization: String,
        lemma: String,
        morphology: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        dialect: Option<String>,
    },
    Search(SearchForm),
}

impl RequestPayload {
    /// The kind tag for this payload.
    pub fn kind(&self) -> RequestKind {
        match self {
            RequestPayload::LookupAnnotation { .. } => RequestKind::LookupAnnotation,
            RequestPayload::SuggestAnnotations { .. } => RequestKind::SuggestAnnotations,
            RequestPayload::SaveDocument { .. } => RequestKind::SaveDocument,
            RequestPayload::SaveAnnotation { .. } => RequestKind::SaveAnnotation,
            RequestPayload::Search(_) => RequestKind::Search,
        }
    }
}

/// A request plus the surface it addresses. At most one envelope may be in
/// flight at any time — the [`RequestGovernor`](transport::RequestGovernor)
/// enforces this.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    pub payload: RequestPayload,
    pub scope: RequestScope,
}

impl RequestEnvelope {
    pub fn new(payload: RequestPayload, scope: RequestScope) -> Self {
        Self { payload, scope }
    }

    /// Kind of the wrapped payload.
    pub fn kind(&self) -> RequestKind {
        self.payload.kind()
    }
}

// ── Response types ─────────────────────────────────────────────────

/// Backend response envelope. `error` carries an in-band logical failure;
/// `result` is decoded per request kind at routing time.
#[derive(Debug, Default, Deserialize)]
pub struct BackendResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub page_info: Option<serde_json::Value>,
}

/// One (lemma, morphology) annotation candidate, decoded from the wire's
/// two-element array form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String)")]
pub struct AnnotationCandidate {
    pub lemma: String,
    pub morphology: String,
}

impl From<(String, String)> for AnnotationCandidate {
    fn from((lemma, morphology): (String, String)) -> Self {
        Self { lemma, morphology }
    }
}

/// Decoded result of an automatic-mode lookup: the echoed transcript, the
/// chosen normalization, and the candidate list backing it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String, Vec<AnnotationCandidate>)")]
pub struct AutoLookup {
    pub transcript: String,
    pub normalization: String,
    pub candidates: Vec<AnnotationCandidate>,
}

impl From<(String, String, Vec<AnnotationCandidate>)> for AutoLookup {
    fn from(
        (transcript, normalization, candidates): (String, String, Vec<AnnotationCandidate>),
    ) -> Self {
        Self {
            transcript,
            normalization,
            candidates,
        }
    }
}

// ── Backend ────────────────────────────────────────────────────────

/// Transport-level failure reported by a [`Backend`].
///
/// `Http` carries the status code so the retry policy can recognize
/// conflict-class responses; everything else is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Non-success HTTP status with the response body.
    Http { status: u16, body: String },
    /// Connection-level failure (refused, reset, DNS, ...).
    Network(String),
    /// The response body was not a decodable response envelope.
    Malformed(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Http { status, body } => write!(f, "HTTP {status}: {body}"),
            BackendError::Network(msg) => write!(f, "network error: {msg}"),
            BackendError::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

/// The annotation/search backend as the engine sees it.
///
/// Implementations serialize the envelope, deliver it to the appropriate
/// surface, and decode the response envelope. [`HttpBackend`] is the
/// production implementation; tests substitute scripted backends.
pub trait Backend: Send + Sync {
    fn send<'a>(
        &'a self,
        envelope: &'a RequestEnvelope,
    ) -> BoxFuture<'a, Result<BackendResponse, BackendError>>;
}

// ── HttpBackend ────────────────────────────────────────────────────

/// Async HTTP client posting request envelopes as JSON.
///
/// The document and search views are served by different endpoints; the
/// envelope's [`RequestScope`] selects which one the request goes to.
pub struct HttpBackend {
    client: reqwest::Client,
    document_url: String,
    search_url: String,
}

impl HttpBackend {
    /// Create a backend for the given document and search endpoints.
    pub fn new(
        document_url: impl Into<String>,
        search_url: impl Into<String>,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("glossa-rs/0.1")
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            document_url: document_url.into(),
            search_url: search_url.into(),
        })
    }

    fn url_for(&self, scope: RequestScope) -> &str {
        match scope {
            RequestScope::Document => &self.document_url,
            RequestScope::Search => &self.search_url,
        }
    }
}

impl Backend for HttpBackend {
    fn send<'a>(
        &'a self,
        envelope: &'a RequestEnvelope,
    ) -> BoxFuture<'a, Result<BackendResponse, BackendError>> {
        Box::pin(async move {
            let kind = envelope.kind();
            let url = self.url_for(envelope.scope);
            debug!("backend request: kind={kind}, scope={:?}", envelope.scope);
            trace!(
                "request payload size: {} bytes",
                serde_json::to_string(&envelope.payload).map_or(0, |s| s.len())
            );

            let start = Instant::now();

            let resp = self
                .client
                .post(url)
                .json(&envelope.payload)
                .send()
                .await
                .map_err(|e| BackendError::Network(format!("request failed: {e}")))?;

            let status = resp.status();
            let text = resp
                .text()
                .await
                .map_err(|e| BackendError::Network(format!("failed to read response: {e}")))?;

            debug!(
                "backend response: HTTP {} in {:.1}s ({} bytes)",
                status,
                start.elapsed().as_secs_f64(),
                text.len()
            );

            if !status.is_success() {
                return Err(BackendError::Http {
                    status: status.as_u16(),
                    body: text,
                });
            }

            serde_json::from_str(&text)
                .map_err(|e| BackendError::Malformed(format!("failed to parse response: {e}")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_kind_matches_variant() {
        let payload = RequestPayload::SaveDocument {
            content: "doc".into(),
        };
        assert_eq!(payload.kind(), RequestKind::SaveDocument);
        assert_eq!(payload.kind().to_string(), "save_document");
    }

    #[test]
    fn lookup_payload_skips_empty_fields() {
        let payload = RequestPayload::LookupAnnotation {
            transcript: "slovo".into(),
            normalization: None,
            mode: LookupMode::Auto,
            dialect: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "lookup_annotation");
        assert_eq!(json["mode"], "auto");
        assert!(json.get("normalization").is_none());
        assert!(json.get("dialect").is_none());
    }

    #[test]
    fn search_form_serializes_start_page_always() {
        let form = SearchForm {
            lemma: Some("дом".into()),
            start_page: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json["start_page"], 3);
        assert_eq!(json["lemma"], "дом");
        assert!(json.get("return_total_pages").is_none());
        assert!(json.get("transcript").is_none());
    }

    #[test]
    fn candidate_decodes_from_pair() {
        let c: AnnotationCandidate = serde_json::from_str(r#"["дом","NOUN-nom-sg"]"#).unwrap();
        assert_eq!(c.lemma, "дом");
        assert_eq!(c.morphology, "NOUN-nom-sg");
    }

    #[test]
    fn auto_lookup_decodes_from_triple() {
        let raw = r#"["domu","дому",[["дом","NOUN-dat-sg"],["дом","NOUN-loc-sg"]]]"#;
        let auto: AutoLookup = serde_json::from_str(raw).unwrap();
        assert_eq!(auto.normalization, "дому");
        assert_eq!(auto.candidates.len(), 2);
    }

    #[test]
    fn response_envelope_defaults_are_empty() {
        let resp: BackendResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.error.is_none());
        assert!(resp.result.is_none());
        assert!(resp.total_pages.is_none());
    }

    #[test]
    fn backend_error_display() {
        let err = BackendError::Http {
            status: 409,
            body: "conflict".into(),
        };
        assert_eq!(err.to_string(), "HTTP 409: conflict");
    }
}
