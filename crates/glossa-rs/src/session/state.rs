//! The annotation session state machine.
//!
//! [`AnnotationSession`] coordinates the whole flow: it owns the document
//! tree, the focus range, the annotation form, and the request governor,
//! and drives them in response to operator actions. Activating a token
//! submits a lookup; automatic mode applies or skips and walks on to the
//! next token; manual mode waits in `ManualSelection` for the operator to
//! confirm, then commits the annotation atomically and advances.

use super::events::{EventHandler, NoopHandler, SessionEvent};
use super::search::{FieldValues, Replacement, ReplaceQuery};
use crate::annotation::config::{MenuConfig, TagCatalog};
use crate::annotation::fields::{Activation, FieldActivationEngine};
use crate::annotation::form::AnnotationForm;
use crate::document::focus::{FocusChange, FocusRangeManager};
use crate::document::token::TokenAnnotation;
use crate::document::traversal::next_match;
use crate::document::tree::{DocumentTree, NodeId};
use crate::transport::governor::{Outcome, RequestError, RequestGovernor, SubmitRejected};
use crate::ui::affordance::{SaveControl, SaveIcon};
use crate::ui::pagination::{self, PageWindow};
use crate::{
    AnnotationCandidate, AutoLookup, Backend, LookupMode, RequestEnvelope, RequestKind,
    RequestPayload, RequestScope, SearchForm,
};
use tracing::{debug, error};

// ── State & errors ─────────────────────────────────────────────────

/// Where the session is in the annotation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// A lookup is outstanding for the focused token.
    AwaitingSuggestion,
    /// Suggestions are on screen; the operator is composing an annotation.
    ManualSelection,
    /// An explicit save-document action is outstanding or has failed and
    /// may be retried.
    Saving,
}

/// Failure of a session action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A request is already in flight; the action was rejected, not queued.
    Busy,
    /// The addressed node is not a token.
    NotAToken,
    /// The action needs a focused token and none is set.
    NoFocus,
    /// The action is not available in the current state.
    InvalidState(&'static str),
    /// `open_page` without a prior search.
    NoSearch,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Busy => write!(f, "a request is already in flight"),
            SessionError::NotAToken => write!(f, "node is not a token"),
            SessionError::NoFocus => write!(f, "no token is focused"),
            SessionError::InvalidState(action) => {
                write!(f, "{action} is not available in the current state")
            }
            SessionError::NoSearch => write!(f, "no search has been run yet"),
        }
    }
}

// ── AnnotationSession ──────────────────────────────────────────────

/// Coordinator for one document view.
///
/// Borrows the backend and event handler (bind them to `let` bindings
/// before constructing the session); owns everything else for the lifetime
/// of the view. The activation engine and tag catalog are built once from
/// the menu config and never change afterwards.
pub struct AnnotationSession<'a> {
    backend: &'a dyn Backend,
    handler: &'a dyn EventHandler,
    governor: RequestGovernor,
    tree: DocumentTree,
    engine: FieldActivationEngine,
    catalog: TagCatalog,
    form: AnnotationForm,
    focus: FocusRangeManager,
    state: SessionState,
    scope: RequestScope,
    lookup_mode: LookupMode,
    focused: Option<NodeId>,
    examined_transcript: String,
    suggestions: Vec<String>,
    candidates: Vec<AnnotationCandidate>,
    last_activation: Activation,
    save_control: SaveControl,
    last_search: Option<SearchForm>,
    total_pages: Option<u32>,
    page_window: Option<PageWindow>,
}

impl<'a> AnnotationSession<'a> {
    /// Create a session over a rendered document, building the activation
    /// tables from the menu config.
    pub fn new(
        backend: &'a dyn Backend,
        tree: DocumentTree,
        config: &MenuConfig,
    ) -> Result<Self, String> {
        Ok(Self {
            backend,
            handler: &NoopHandler,
            governor: RequestGovernor::new(),
            tree,
            engine: config.engine()?,
            catalog: config.catalog(),
            form: AnnotationForm::new(),
            focus: FocusRangeManager::new(),
            state: SessionState::Idle,
            scope: RequestScope::Document,
            lookup_mode: LookupMode::Manual,
            focused: None,
            examined_transcript: String::new(),
            suggestions: Vec::new(),
            candidates: Vec::new(),
            last_activation: Activation::default(),
            save_control: SaveControl::new(),
            last_search: None,
            total_pages: None,
            page_window: None,
        })
    }

    /// Attach an event handler.
    pub fn with_event_handler(mut self, handler: &'a dyn EventHandler) -> Self {
        self.handler = handler;
        self
    }

    /// Replace the request governor (timeout / retry configuration).
    pub fn with_governor(mut self, governor: RequestGovernor) -> Self {
        self.governor = governor;
        self
    }

    /// Address the search view's endpoints instead of the document view's.
    pub fn with_scope(mut self, scope: RequestScope) -> Self {
        self.scope = scope;
        self
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// The focused run, left to right: the extension range if one is in
    /// progress, else the single focused token.
    pub fn focused_run(&self) -> Vec<NodeId> {
        let run = self.focus.focused();
        if run.is_empty() {
            self.focused.into_iter().collect()
        } else {
            run
        }
    }

    pub fn form(&self) -> &AnnotationForm {
        &self.form
    }

    /// Current normalization suggestions (manual mode).
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Current annotation candidates.
    pub fn candidates(&self) -> &[AnnotationCandidate] {
        &self.candidates
    }

    /// Activation of the form fields as of the last selection change.
    pub fn activation(&self) -> &Activation {
        &self.last_activation
    }

    pub fn save_icon(&self) -> SaveIcon {
        self.save_control.icon()
    }

    pub fn page_window(&self) -> Option<&PageWindow> {
        self.page_window.as_ref()
    }

    /// Switch between automatic and manual lookups.
    pub fn set_lookup_mode(&mut self, mode: LookupMode) {
        self.lookup_mode = mode;
    }

    // ── Token activation ───────────────────────────────────────────

    /// Focus a token and request its annotation.
    ///
    /// Manual mode submits one lookup and settles into `ManualSelection`
    /// with the suggestions listed. Automatic mode applies the returned
    /// best candidate (or skips the token when the backend has none) and
    /// walks on to the next token in document order, looking each one up
    /// in turn until the document ends or a lookup fails.
    pub async fn activate_token(&mut self, token: NodeId) -> Result<(), SessionError> {
        let mut current = token;
        loop {
            let transcript = self
                .tree
                .token(current)
                .ok_or(SessionError::NotAToken)?
                .transcript
                .clone();

            self.focus.clear();
            self.focused = Some(current);
            self.emit(SessionEvent::TokenActivated {
                token: current,
                mode: self.lookup_mode,
            });

            match self.lookup_mode {
                LookupMode::Manual => {
                    self.suggestions.clear();
                    self.candidates.clear();
                    self.form.clear();
                    self.examined_transcript = transcript.clone();

                    let payload = RequestPayload::LookupAnnotation {
                        normalization: self
                            .tree
                            .token(current)
                            .and_then(|f| f.normalization())
                            .map(str::to_string),
                        transcript,
                        mode: LookupMode::Manual,
                        dialect: self.tree.dialect_of(current).map(str::to_string),
                    };

                    let prev = self.state;
                    self.state = SessionState::AwaitingSuggestion;
                    let outcome = match self.submit(payload).await {
                        Ok(outcome) => outcome,
                        Err(err) => {
                            self.state = prev;
                            return Err(err);
                        }
                    };

                    match outcome {
                        Outcome::Success(resp) => {
                            let suggestions: Vec<String> = resp
                                .result
                                .and_then(|v| serde_json::from_value(v).ok())
                                .unwrap_or_default();
                            if let Some(first) = suggestions.first() {
                                self.form.normalization = first.clone();
                            }
                            self.suggestions = suggestions;
                            self.state = SessionState::ManualSelection;
                            self.emit(SessionEvent::SuggestionsListed {
                                token: current,
                                count: self.suggestions.len(),
                                preselected: self.suggestions.first().map(String::as_str),
                            });
                        }
                        Outcome::Failed(err) => {
                            self.state = SessionState::Idle;
                            self.route_failure(RequestKind::LookupAnnotation, err);
                        }
                    }
                    return Ok(());
                }

                LookupMode::Auto => {
                    let payload = RequestPayload::LookupAnnotation {
                        transcript,
                        normalization: None,
                        mode: LookupMode::Auto,
                        dialect: None,
                    };

                    let prev = self.state;
                    self.state = SessionState::AwaitingSuggestion;
                    let outcome = match self.submit(payload).await {
                        Ok(outcome) => outcome,
                        Err(err) => {
                            self.state = prev;
                            return Err(err);
                        }
                    };

                    match outcome {
                        Outcome::Success(resp) => {
                            // An absent or undecodable result is "no
                            // suggestion": the token is skipped.
                            let annotation = resp
                                .result
                                .and_then(|v| serde_json::from_value::<AutoLookup>(v).ok())
                                .and_then(|auto| {
                                    TokenAnnotation::from_candidates(
                                        auto.normalization,
                                        &auto.candidates,
                                    )
                                });

                            match annotation {
                                Some(annotation) => {
                                    if let Some(fields) = self.tree.token_mut(current) {
                                        fields.apply(annotation);
                                    }
                                    self.emit(SessionEvent::AnnotationApplied {
                                        token: current,
                                        mode: LookupMode::Auto,
                                    });
                                }
                                None => {
                                    self.emit(SessionEvent::TokenSkipped { token: current });
                                }
                            }
                            self.state = SessionState::Idle;

                            match self.advance_from(current) {
                                Some(next) => {
                                    current = next;
                                    continue;
                                }
                                None => {
                                    self.emit(SessionEvent::DocumentEndReached { last: current });
                                    return Ok(());
                                }
                            }
                        }
                        Outcome::Failed(err) => {
                            self.state = SessionState::Idle;
                            self.route_failure(RequestKind::LookupAnnotation, err);
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    // ── Manual annotation flow ─────────────────────────────────────

    /// Pick a normalization suggestion into the form.
    pub fn select_suggestion(&mut self, index: usize) -> Option<&str> {
        let suggestion = self.suggestions.get(index)?;
        self.form.normalization = suggestion.clone();
        Some(suggestion)
    }

    /// Request annotation candidates for the current normalization.
    pub async fn request_candidates(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::ManualSelection {
            return Err(SessionError::InvalidState("candidate lookup"));
        }
        let focused = self.focused.ok_or(SessionError::NoFocus)?;

        let payload = RequestPayload::SuggestAnnotations {
            transcript: self.examined_transcript.clone(),
            normalization: self.form.normalization.clone(),
            dialect: self.tree.dialect_of(focused).map(str::to_string),
        };

        match self.submit(payload).await? {
            Outcome::Success(resp) => {
                self.candidates = resp
                    .result
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default();
                self.emit(SessionEvent::CandidatesListed {
                    count: self.candidates.len(),
                });
                if !self.candidates.is_empty() {
                    self.select_candidate(0);
                }
            }
            Outcome::Failed(err) => {
                self.route_failure(RequestKind::SuggestAnnotations, err);
            }
        }
        Ok(())
    }

    /// Load a candidate into the form and recompute field activation.
    pub fn select_candidate(&mut self, index: usize) -> Option<Activation> {
        let candidate = self.candidates.get(index)?.clone();
        let normalization = self.form.normalization.clone();
        self.form.populate(&candidate, &normalization, &self.catalog);
        Some(self.reactivate())
    }

    /// Choose a selector tag and recompute activation.
    pub fn choose_tag(&mut self, category: &str, tag: &str) -> Activation {
        self.form.selection.choose(category, tag);
        self.reactivate()
    }

    /// Check or uncheck a facultative tag and recompute activation.
    pub fn set_checkbox(&mut self, tag: &str, checked: bool) -> Activation {
        if checked {
            self.form.selection.check(tag);
        } else {
            self.form.selection.uncheck(tag);
        }
        self.reactivate()
    }

    /// Overwrite the normalization input.
    pub fn set_normalization_input(&mut self, value: impl Into<String>) {
        self.form.normalization = value.into();
    }

    /// Overwrite the lemma input.
    pub fn set_lemma_input(&mut self, value: impl Into<String>) {
        self.form.lemma = value.into();
    }

    /// Confirm the composed annotation: submit the save-annotation request
    /// and, once it succeeds, commit normalization + lemma + morphology to
    /// the focused token as one atomic update and advance to the next
    /// token. A failed save leaves the token untouched and the session in
    /// `ManualSelection` so the operator can retry.
    pub async fn confirm_annotation(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::ManualSelection {
            return Err(SessionError::InvalidState("annotation confirmation"));
        }
        let focused = self.focused.ok_or(SessionError::NoFocus)?;

        let activation = self.reactivate();
        let morphology = self
            .form
            .compose_morphology(self.engine.descriptors(), &activation);
        let annotation =
            TokenAnnotation::confirmed(&self.form.normalization, &self.form.lemma, &morphology);

        let payload = RequestPayload::SaveAnnotation {
            transcript: self.examined_transcript.clone(),
            normalization: self.form.normalization.clone(),
            lemma: self.form.lemma.clone(),
            morphology,
            dialect: match self.scope {
                RequestScope::Search => self.tree.dialect_of(focused).map(str::to_string),
                RequestScope::Document => None,
            },
        };

        match self.submit(payload).await? {
            Outcome::Success(_) => {
                if let Some(fields) = self.tree.token_mut(focused) {
                    fields.apply(annotation);
                }
                self.emit(SessionEvent::AnnotationApplied {
                    token: focused,
                    mode: LookupMode::Manual,
                });
                self.state = SessionState::Idle;

                match self.advance_from(focused) {
                    Some(next) => return self.activate_token(next).await,
                    None => {
                        self.emit(SessionEvent::DocumentEndReached { last: focused });
                    }
                }
            }
            Outcome::Failed(err) => {
                // No write happened: the prior fields stay intact.
                self.route_failure(RequestKind::SaveAnnotation, err);
            }
        }
        Ok(())
    }

    // ── Saving the document ────────────────────────────────────────

    /// Explicitly save the whole document.
    ///
    /// Ignored (Ok, no request) while the save icon already shows a save
    /// in flight. On failure the session stays in `Saving` with the
    /// affordance rolled back, so the same action can be retried.
    pub async fn save_document(&mut self) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::Idle | SessionState::Saving) {
            return Err(SessionError::InvalidState("document save"));
        }
        if !self.save_control.begin() {
            return Ok(());
        }

        let prev = self.state;
        self.state = SessionState::Saving;
        self.emit(SessionEvent::SaveStarted);

        let payload = RequestPayload::SaveDocument {
            content: self.tree.export_markup(),
        };

        let outcome = match self.submit(payload).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.save_control.restore();
                self.state = prev;
                return Err(err);
            }
        };

        match outcome {
            Outcome::Success(_) => {
                self.save_control.restore();
                self.state = SessionState::Idle;
                self.emit(SessionEvent::SaveCompleted);
                self.emit(SessionEvent::AffordanceRestored {
                    kind: RequestKind::SaveDocument,
                });
            }
            Outcome::Failed(err) => {
                self.route_failure(RequestKind::SaveDocument, err);
            }
        }
        Ok(())
    }

    // ── Search ─────────────────────────────────────────────────────

    /// Run a search. The response markup is handed to the frontend via
    /// [`SessionEvent::SearchCompleted`] along with the page window when
    /// the result set is paginated.
    pub async fn search(&mut self, form: SearchForm) -> Result<(), SessionError> {
        let request = form.clone();

        match self.submit(RequestPayload::Search(form)).await? {
            Outcome::Success(resp) => {
                if let Some(total) = resp.total_pages {
                    self.total_pages = Some(total);
                }
                let markup = resp
                    .result
                    .as_ref()
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string();

                self.page_window = self
                    .total_pages
                    .map(|total| pagination::build(request.start_page.max(1), total));
                self.last_search = Some(request);

                self.emit(SessionEvent::SearchCompleted {
                    markup: &markup,
                    window: self.page_window.as_ref(),
                });
                self.emit(SessionEvent::AffordanceRestored {
                    kind: RequestKind::Search,
                });
            }
            Outcome::Failed(err) => {
                self.route_failure(RequestKind::Search, err);
            }
        }
        Ok(())
    }

    /// Open another page of the last search.
    pub async fn open_page(&mut self, page: u32) -> Result<(), SessionError> {
        let mut form = self.last_search.clone().ok_or(SessionError::NoSearch)?;
        form.start_page = page;
        form.return_total_pages = false;
        self.search(form).await
    }

    /// Prefill replacement form values from a token.
    pub fn replace_template(&self, token: NodeId) -> Option<FieldValues> {
        self.tree.token(token).map(FieldValues::of)
    }

    /// Rewrite every token matching `query`. Returns the number written.
    pub fn replace_all(&mut self, query: &ReplaceQuery, replacement: &Replacement) -> usize {
        super::search::replace_all(&mut self.tree, query, replacement)
    }

    // ── Focus range ────────────────────────────────────────────────

    /// Grow the focus range one token to the left (or undo a rightward
    /// extension).
    pub fn extend_focus_left(&mut self) -> FocusChange {
        let Some(focused) = self.focused else {
            return FocusChange::None;
        };
        let change = self.focus.extend_left(&self.tree, focused);
        self.emit(SessionEvent::FocusRangeChanged { change });
        change
    }

    /// Mirror of [`extend_focus_left`](Self::extend_focus_left).
    pub fn extend_focus_right(&mut self) -> FocusChange {
        let Some(focused) = self.focused else {
            return FocusChange::None;
        };
        let change = self.focus.extend_right(&self.tree, focused);
        self.emit(SessionEvent::FocusRangeChanged { change });
        change
    }

    // ── Internals ──────────────────────────────────────────────────

    fn emit(&self, event: SessionEvent<'_>) {
        self.handler.on_event(&event);
    }

    /// Recompute field activation for the current selection.
    fn reactivate(&mut self) -> Activation {
        let activation = self.engine.activate(&mut self.form.selection);
        self.last_activation = activation.clone();
        activation
    }

    /// Next token in document order after `from`, with the advance event.
    fn advance_from(&self, from: NodeId) -> Option<NodeId> {
        let next = next_match(&self.tree, from, |tree, id| tree.is_token(id))?;
        self.emit(SessionEvent::FocusAdvanced { from, to: next });
        Some(next)
    }

    /// Submit a payload through the governor. Search requests always go to
    /// the search surface; everything else follows the session's scope.
    async fn submit(&self, payload: RequestPayload) -> Result<Outcome, SessionError> {
        let scope = if payload.kind() == RequestKind::Search {
            RequestScope::Search
        } else {
            self.scope
        };
        let envelope = RequestEnvelope::new(payload, scope);
        match self.governor.submit(self.backend, &envelope).await {
            Ok(outcome) => Ok(outcome),
            Err(SubmitRejected) => {
                self.emit(SessionEvent::SubmissionRejected {
                    kind: envelope.kind(),
                });
                Err(SessionError::Busy)
            }
        }
    }

    /// Route a terminal failure: roll back in-flight affordances, then
    /// either log-and-ignore (application errors) or notify the operator.
    fn route_failure(&mut self, kind: RequestKind, err: RequestError) {
        match kind {
            RequestKind::SaveDocument => {
                self.save_control.restore();
                self.emit(SessionEvent::AffordanceRestored { kind });
            }
            RequestKind::Search => {
                self.emit(SessionEvent::AffordanceRestored { kind });
            }
            _ => {}
        }

        match err {
            RequestError::Application(message) => {
                debug!("{kind} application error ignored: {message}");
                self.emit(SessionEvent::ApplicationErrorIgnored {
                    kind,
                    message: &message,
                });
            }
            err => {
                error!("{kind} failed: {err}");
                self.emit(SessionEvent::ErrorNotified { kind, error: &err });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackendError, BackendResponse};
    use futures::future::BoxFuture;
    use std::sync::Mutex;

    // ── Fixtures ───────────────────────────────────────────────────

    fn menu() -> MenuConfig {
        MenuConfig::from_value(&serde_json::json!({
            "grammemes": {
                "noun":       { "category": "part of speech", "surface_tag": "NOUN" },
                "verb":       { "category": "part of speech", "surface_tag": "VERB" },
                "nominative": { "category": "case", "surface_tag": "nom" },
                "dative":     { "category": "case", "surface_tag": "dat" },
                "singular":   { "category": "number", "surface_tag": "sg" }
            },
            "order": {
                "NOUN": { "default": ["case", "number"] }
            },
            "facultative": {
                "arch": { "label": "Archaic", "depends_on": "*" }
            }
        }))
        .unwrap()
    }

    fn document() -> (DocumentTree, Vec<NodeId>) {
        let mut tree = DocumentTree::new();
        let u = tree.push_utterance(tree.root(), Some("northern".into()));
        let a = tree.push_token(u, "domu");
        let b = tree.push_token(u, "reki");
        (tree, vec![a, b])
    }

    struct Scripted {
        replies: Mutex<Vec<Result<BackendResponse, BackendError>>>,
        sent: Mutex<Vec<RequestEnvelope>>,
    }

    impl Scripted {
        fn new(mut replies: Vec<Result<BackendResponse, BackendError>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<RequestEnvelope> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Backend for Scripted {
        fn send<'b>(
            &'b self,
            envelope: &'b RequestEnvelope,
        ) -> BoxFuture<'b, Result<BackendResponse, BackendError>> {
            Box::pin(async move {
                self.sent.lock().unwrap().push(envelope.clone());
                self.replies
                    .lock()
                    .unwrap()
                    .pop()
                    .unwrap_or(Err(BackendError::Network("script exhausted".into())))
            })
        }
    }

    /// Handler recording event names in order.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Recorder {
        fn names(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl EventHandler for Recorder {
        fn on_event(&self, event: &SessionEvent<'_>) {
            let name = match event {
                SessionEvent::TokenActivated { .. } => "activated",
                SessionEvent::SuggestionsListed { .. } => "suggestions",
                SessionEvent::CandidatesListed { .. } => "candidates",
                SessionEvent::AnnotationApplied { .. } => "applied",
                SessionEvent::TokenSkipped { .. } => "skipped",
                SessionEvent::FocusAdvanced { .. } => "advanced",
                SessionEvent::DocumentEndReached { .. } => "end",
                SessionEvent::FocusRangeChanged { .. } => "range",
                SessionEvent::SaveStarted => "save-started",
                SessionEvent::SaveCompleted => "save-completed",
                SessionEvent::AffordanceRestored { .. } => "affordance",
                SessionEvent::SearchCompleted { .. } => "search",
                SessionEvent::ErrorNotified { .. } => "error",
                SessionEvent::ApplicationErrorIgnored { .. } => "app-error",
                SessionEvent::SubmissionRejected { .. } => "rejected",
            };
            self.0.lock().unwrap().push(name.to_string());
        }
    }

    fn success(result: serde_json::Value) -> Result<BackendResponse, BackendError> {
        Ok(BackendResponse {
            result: Some(result),
            ..Default::default()
        })
    }

    fn empty_success() -> Result<BackendResponse, BackendError> {
        Ok(BackendResponse::default())
    }

    fn transport_failure() -> Result<BackendResponse, BackendError> {
        Err(BackendError::Http {
            status: 500,
            body: "boom".into(),
        })
    }

    // ── Automatic mode ─────────────────────────────────────────────

    #[tokio::test]
    async fn auto_mode_applies_and_walks_to_document_end() {
        let backend = Scripted::new(vec![
            success(serde_json::json!([
                "domu",
                "дому",
                [["дом", "NOUN-dat-sg"], ["дом", "NOUN-loc-sg"]]
            ])),
            success(serde_json::Value::Null),
        ]);
        let recorder = Recorder::default();
        let (tree, toks) = document();
        let mut session = AnnotationSession::new(&backend, tree, &menu())
            .unwrap()
            .with_event_handler(&recorder);
        session.set_lookup_mode(LookupMode::Auto);

        session.activate_token(toks[0]).await.unwrap();

        // First token annotated from the first candidate, second skipped.
        let ann = session.tree().token(toks[0]).unwrap().annotation.clone().unwrap();
        assert_eq!(ann.normalization, "дому");
        assert_eq!(ann.morphology, "NOUN-dat-sg");
        assert_eq!(ann.morphology_full, "дом-NOUN-dat-sg/дом-NOUN-loc-sg");
        assert!(session.tree().token(toks[1]).unwrap().annotation.is_none());

        assert_eq!(
            recorder.names(),
            vec!["activated", "applied", "advanced", "activated", "skipped", "end"]
        );
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn auto_mode_failure_stops_the_walk() {
        let backend = Scripted::new(vec![transport_failure()]);
        let recorder = Recorder::default();
        let (tree, toks) = document();
        let mut session = AnnotationSession::new(&backend, tree, &menu())
            .unwrap()
            .with_event_handler(&recorder);
        session.set_lookup_mode(LookupMode::Auto);

        session.activate_token(toks[0]).await.unwrap();

        assert_eq!(recorder.names(), vec!["activated", "error"]);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(backend.sent().len(), 1);
    }

    // ── Manual mode ────────────────────────────────────────────────

    #[tokio::test]
    async fn manual_activation_lists_suggestions_and_preselects_first() {
        let backend = Scripted::new(vec![success(serde_json::json!(["дому", "дом"]))]);
        let (tree, toks) = document();
        let mut session = AnnotationSession::new(&backend, tree, &menu()).unwrap();

        session.activate_token(toks[0]).await.unwrap();

        assert_eq!(session.state(), SessionState::ManualSelection);
        assert_eq!(session.suggestions(), &["дому".to_string(), "дом".into()]);
        assert_eq!(session.form().normalization, "дому");

        // The lookup carried the transcript and the utterance dialect.
        let sent = backend.sent();
        match &sent[0].payload {
            RequestPayload::LookupAnnotation {
                transcript,
                dialect,
                mode,
                ..
            } => {
                assert_eq!(transcript, "domu");
                assert_eq!(dialect.as_deref(), Some("northern"));
                assert_eq!(*mode, LookupMode::Manual);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn candidate_request_populates_form_and_activation() {
        let backend = Scripted::new(vec![
            success(serde_json::json!(["дому"])),
            success(serde_json::json!([["дом", "NOUN-dat-sg"], ["дом", "NOUN-loc-sg"]])),
        ]);
        let (tree, toks) = document();
        let mut session = AnnotationSession::new(&backend, tree, &menu()).unwrap();

        session.activate_token(toks[0]).await.unwrap();
        session.request_candidates().await.unwrap();

        assert_eq!(session.candidates().len(), 2);
        assert_eq!(session.form().lemma, "дом");
        assert_eq!(session.form().selection.tag_for("part of speech"), Some("NOUN"));
        assert_eq!(session.form().selection.tag_for("case"), Some("dat"));
        assert!(session.activation().active.contains("case"));
    }

    #[tokio::test]
    async fn confirm_commits_atomically_and_advances() {
        let backend = Scripted::new(vec![
            success(serde_json::json!(["дому"])),
            success(serde_json::json!([["дом", "NOUN-dat-sg"]])),
            empty_success(),
            success(serde_json::json!(["реки"])),
        ]);
        let recorder = Recorder::default();
        let (tree, toks) = document();
        let mut session = AnnotationSession::new(&backend, tree, &menu())
            .unwrap()
            .with_event_handler(&recorder);

        session.activate_token(toks[0]).await.unwrap();
        session.request_candidates().await.unwrap();
        session.confirm_annotation().await.unwrap();

        let ann = session.tree().token(toks[0]).unwrap().annotation.clone().unwrap();
        assert_eq!(ann.normalization, "дому");
        assert_eq!(ann.lemma, "дом");
        assert_eq!(ann.morphology, "NOUN-dat-sg");
        assert_eq!(ann.morphology_full, "дом-NOUN-dat-sg");

        // Advanced into the next token's manual lookup.
        assert_eq!(session.focused(), Some(toks[1]));
        assert_eq!(session.state(), SessionState::ManualSelection);

        let sent = backend.sent();
        assert_eq!(sent.len(), 4);
        match &sent[2].payload {
            RequestPayload::SaveAnnotation {
                transcript,
                normalization,
                lemma,
                morphology,
                dialect,
            } => {
                assert_eq!(transcript, "domu");
                assert_eq!(normalization, "дому");
                assert_eq!(lemma, "дом");
                assert_eq!(morphology, "NOUN-dat-sg");
                assert!(dialect.is_none(), "dialect only travels in search scope");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_save_leaves_token_untouched() {
        let backend = Scripted::new(vec![
            success(serde_json::json!(["дому"])),
            success(serde_json::json!([["дом", "NOUN-dat-sg"]])),
            transport_failure(),
        ]);
        let recorder = Recorder::default();
        let (tree, toks) = document();
        let mut session = AnnotationSession::new(&backend, tree, &menu())
            .unwrap()
            .with_event_handler(&recorder);

        session.activate_token(toks[0]).await.unwrap();
        session.request_candidates().await.unwrap();
        session.confirm_annotation().await.unwrap();

        // No partial update: the token still has no annotation at all.
        assert!(session.tree().token(toks[0]).unwrap().annotation.is_none());
        assert_eq!(session.state(), SessionState::ManualSelection);
        assert!(recorder.names().contains(&"error".to_string()));
    }

    #[tokio::test]
    async fn confirm_outside_manual_selection_is_rejected() {
        let backend = Scripted::new(vec![]);
        let (tree, _) = document();
        let mut session = AnnotationSession::new(&backend, tree, &menu()).unwrap();

        assert_eq!(
            session.confirm_annotation().await.unwrap_err(),
            SessionError::InvalidState("annotation confirmation")
        );
    }

    // ── Saving ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn save_document_roundtrip_restores_affordance() {
        let backend = Scripted::new(vec![empty_success()]);
        let recorder = Recorder::default();
        let (tree, _) = document();
        let mut session = AnnotationSession::new(&backend, tree, &menu())
            .unwrap()
            .with_event_handler(&recorder);

        session.save_document().await.unwrap();

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.save_icon(), SaveIcon::Floppy);
        assert_eq!(
            recorder.names(),
            vec!["save-started", "save-completed", "affordance"]
        );

        match &backend.sent()[0].payload {
            RequestPayload::SaveDocument { content } => {
                assert_eq!(content, "domu reki");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_save_stays_in_saving_and_allows_retry() {
        let backend = Scripted::new(vec![transport_failure(), empty_success()]);
        let recorder = Recorder::default();
        let (tree, _) = document();
        let mut session = AnnotationSession::new(&backend, tree, &menu())
            .unwrap()
            .with_event_handler(&recorder);

        session.save_document().await.unwrap();
        assert_eq!(session.state(), SessionState::Saving);
        assert_eq!(session.save_icon(), SaveIcon::Floppy, "affordance rolled back");
        assert!(recorder.names().contains(&"error".to_string()));

        // Same action again succeeds.
        session.save_document().await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn application_error_on_save_is_silent() {
        let backend = Scripted::new(vec![Ok(BackendResponse {
            error: Some("stale revision".into()),
            ..Default::default()
        })]);
        let recorder = Recorder::default();
        let (tree, _) = document();
        let mut session = AnnotationSession::new(&backend, tree, &menu())
            .unwrap()
            .with_event_handler(&recorder);

        session.save_document().await.unwrap();

        let names = recorder.names();
        assert!(names.contains(&"app-error".to_string()));
        assert!(!names.contains(&"error".to_string()), "no blocking alert");
        assert_eq!(session.save_icon(), SaveIcon::Floppy);
    }

    // ── Search ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn search_builds_page_window_with_first_page_current() {
        let backend = Scripted::new(vec![Ok(BackendResponse {
            result: Some(serde_json::json!("<results>")),
            total_pages: Some(5),
            ..Default::default()
        })]);
        let recorder = Recorder::default();
        let (tree, _) = document();
        let mut session = AnnotationSession::new(&backend, tree, &menu())
            .unwrap()
            .with_event_handler(&recorder);

        session
            .search(SearchForm {
                lemma: Some("дом".into()),
                return_total_pages: true,
                ..Default::default()
            })
            .await
            .unwrap();

        let window = session.page_window().unwrap();
        assert_eq!(window.total_pages, 5);
        assert_eq!(window.current_page, 1);
        assert_eq!(recorder.names(), vec!["search", "affordance"]);

        // Search requests always address the search surface.
        assert_eq!(backend.sent()[0].scope, RequestScope::Search);
    }

    #[tokio::test]
    async fn open_page_reissues_the_last_search() {
        let backend = Scripted::new(vec![
            Ok(BackendResponse {
                result: Some(serde_json::json!("<p1>")),
                total_pages: Some(40),
                ..Default::default()
            }),
            Ok(BackendResponse {
                result: Some(serde_json::json!("<p7>")),
                ..Default::default()
            }),
        ]);
        let (tree, _) = document();
        let mut session = AnnotationSession::new(&backend, tree, &menu()).unwrap();

        session
            .search(SearchForm {
                lemma: Some("дом".into()),
                return_total_pages: true,
                ..Default::default()
            })
            .await
            .unwrap();
        session.open_page(7).await.unwrap();

        let window = session.page_window().unwrap();
        assert_eq!(window.current_page, 7);
        assert_eq!(window.total_pages, 40, "total carried over from first search");

        match &backend.sent()[1].payload {
            RequestPayload::Search(form) => {
                assert_eq!(form.start_page, 7);
                assert!(!form.return_total_pages);
                assert_eq!(form.lemma.as_deref(), Some("дом"));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn open_page_without_search_is_an_error() {
        let backend = Scripted::new(vec![]);
        let (tree, _) = document();
        let mut session = AnnotationSession::new(&backend, tree, &menu()).unwrap();
        assert_eq!(
            session.open_page(2).await.unwrap_err(),
            SessionError::NoSearch
        );
    }

    // ── Focus range ────────────────────────────────────────────────

    #[tokio::test]
    async fn focus_range_grows_from_the_focused_token() {
        let backend = Scripted::new(vec![success(serde_json::json!(["реки"]))]);
        let (tree, toks) = document();
        let mut session = AnnotationSession::new(&backend, tree, &menu()).unwrap();

        session.activate_token(toks[1]).await.unwrap();
        assert_eq!(session.extend_focus_left(), FocusChange::Focused(toks[0]));
        assert_eq!(session.focused_run(), toks);

        // Undo before grow: extending right pops the left extension.
        assert_eq!(session.extend_focus_right(), FocusChange::Unfocused(toks[0]));
        assert_eq!(session.focused_run(), vec![toks[1]]);
    }
}
