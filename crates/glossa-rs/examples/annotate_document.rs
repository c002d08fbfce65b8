//! Minimal annotation run — a two-token document annotated in automatic
//! mode against a scripted in-memory backend.
//!
//! Shows the pieces an embedding frontend wires together: a [`Backend`]
//! implementation, the menu config, the document tree, and the session
//! with an event handler.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example annotate_document
//! ```

use futures::future::BoxFuture;
use glossa_rs::prelude::*;
use std::sync::Mutex;

/// Backend that answers lookups from a canned reply list.
struct CannedBackend {
    replies: Mutex<Vec<serde_json::Value>>,
}

impl Backend for CannedBackend {
    fn send<'a>(
        &'a self,
        _envelope: &'a RequestEnvelope,
    ) -> BoxFuture<'a, Result<BackendResponse, BackendError>> {
        Box::pin(async move {
            let result = self.replies.lock().unwrap().pop();
            Ok(BackendResponse {
                result,
                ..Default::default()
            })
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    tracing_subscriber::fmt::init();

    // 1. The annotation menu: one selector chain for nouns.
    let config = MenuConfig::from_str(
        r#"{
            "grammemes": {
                "noun":       { "category": "part of speech", "surface_tag": "NOUN" },
                "dative":     { "category": "case", "surface_tag": "dat" },
                "singular":   { "category": "number", "surface_tag": "sg" }
            },
            "order": {
                "NOUN": { "default": ["case", "number"] }
            }
        }"#,
    )?;

    // 2. A rendered document: one utterance, two tokens.
    let mut tree = DocumentTree::new();
    let utterance = tree.push_utterance(tree.root(), Some("northern".into()));
    let first = tree.push_token(utterance, "domu");
    tree.push_token(utterance, "reki");

    // 3. Scripted lookup replies, served back-to-front: the second token
    //    has no suggestion and is skipped.
    let backend = CannedBackend {
        replies: Mutex::new(vec![
            serde_json::Value::Null,
            serde_json::json!(["domu", "дому", [["дом", "NOUN-dat-sg"]]]),
        ]),
    };

    // 4. Run the automatic pass from the first token.
    let handler = LoggingHandler;
    let mut session = AnnotationSession::new(&backend, tree, &config)?
        .with_event_handler(&handler);
    session.set_lookup_mode(LookupMode::Auto);
    session
        .activate_token(first)
        .await
        .map_err(|e| e.to_string())?;

    // 5. Print the annotated document.
    println!("{}", session.tree().export_markup());
    Ok(())
}
