//! Operator notifications via a `tracing` layer.
//!
//! Terminal request failures are logged at WARN/ERROR by the transport and
//! session; this layer captures those events into a buffer any frontend can
//! drain at its own pace and render as a blocking notification or a toast.
//! The buffer has its own mutex, so logging never contends with rendering.

use std::sync::{Arc, Mutex};

use chrono::Local;
use tracing::Subscriber;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::registry::LookupSpan;

/// Cap on buffered notices before the oldest are dropped.
pub const MAX_NOTICES: usize = 200;
const TRIM_TO: usize = 150;

/// Severity of a captured notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warn,
    Error,
}

/// One captured notice.
#[derive(Debug, Clone)]
pub struct Notice {
    /// Wall-clock `HH:MM:SS` capture time.
    pub time: String,
    pub level: NoticeLevel,
    pub message: String,
}

/// Shared buffer of pending notices.
#[derive(Clone, Default)]
pub struct NotificationBuffer(Arc<Mutex<Vec<Notice>>>);

impl NotificationBuffer {
    fn new() -> Self {
        Self::default()
    }

    /// Drain all pending notices, returning them oldest-first.
    pub fn drain(&self) -> Vec<Notice> {
        let mut buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *buf)
    }

    fn push(&self, notice: Notice) {
        if let Ok(mut buf) = self.0.lock() {
            buf.push(notice);
            if buf.len() > MAX_NOTICES {
                let trim_to = buf.len() - TRIM_TO;
                buf.drain(..trim_to);
            }
        }
    }
}

/// A [`tracing_subscriber::Layer`] that captures WARN and ERROR events
/// into a [`NotificationBuffer`]. Lower levels pass through untouched.
pub struct NotificationLayer {
    buffer: NotificationBuffer,
}

impl NotificationLayer {
    /// Create the layer and its associated buffer. Register the layer with
    /// the subscriber registry and hand the buffer to the frontend.
    pub fn new() -> (Self, NotificationBuffer) {
        let buffer = NotificationBuffer::new();
        (
            Self {
                buffer: buffer.clone(),
            },
            buffer,
        )
    }
}

impl<S: Subscriber + for<'a> LookupSpan<'a>> Layer<S> for NotificationLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let level = match *event.metadata().level() {
            tracing::Level::WARN => NoticeLevel::Warn,
            tracing::Level::ERROR => NoticeLevel::Error,
            _ => return,
        };

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.buffer.push(Notice {
            time: Local::now().format("%H:%M:%S").to_string(),
            level,
            message: visitor.message,
        });
    }
}

/// Visitor that extracts the message field from a tracing event.
#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let raw = format!("{value:?}");
            if raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2 {
                #[allow(clippy::string_slice)] // stripping 1-byte ASCII quote chars
                {
                    self.message = raw[1..raw.len() - 1].to_string();
                }
            } else {
                self.message = raw;
            }
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}
