//! Logging setup and the [`LogRing`] behind `GET /logs`.
//!
//! Every `tracing` event goes to stdout through the `fmt` layer and, in
//! parallel, through [`LogRingLayer`] into a bounded in-memory ring the
//! dashboard polls.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};

// ---

use serde::Serialize;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// LogEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    // ---
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    pub level: String,
    pub emoji: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// LogRing
// ---------------------------------------------------------------------------

/// Bounded, shareable list of the most recent log entries. Oldest entries
/// are evicted first.
#[derive(Debug, Clone)]
pub struct LogRing {
    // ---
    capacity: usize,
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl LogRing {
    // ---
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
        }
    }

    pub fn push(&self, entry: LogEntry) {
        // ---
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        if self.capacity > 0 {
            entries.push_back(entry);
        }
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// LogRingLayer
// ---------------------------------------------------------------------------

pub struct LogRingLayer {
    ring: LogRing,
}

impl LogRingLayer {
    pub fn new(ring: LogRing) -> Self {
        Self { ring }
    }
}

impl<S: Subscriber> Layer<S> for LogRingLayer {
    // ---
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        // ---
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let level = *event.metadata().level();
        self.ring.push(LogEntry {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            level: level.as_str().to_ascii_lowercase(),
            emoji: emoji_for(level).to_string(),
            message: visitor.render(),
        });
    }
}

// ---

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl FieldVisitor {
    // ---
    fn record(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }

    /// Message with markdown emphasis removed, then `key=value` fields.
    fn render(self) -> String {
        // ---
        let mut out = clean_message(self.message.as_deref().unwrap_or_default());
        for (key, value) in &self.fields {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
        out
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn emoji_for(level: Level) -> &'static str {
    match level {
        Level::INFO => "💬",
        Level::WARN => "⚠️",
        Level::ERROR => "❌",
        _ => "📝",
    }
}

fn clean_message(raw: &str) -> String {
    raw.replace("**", "").replace("__", "").trim().to_string()
}

// ---

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
pub fn init(default_level: &str, ring: LogRing) {
    // ---
    let no_color = std::env::var("EMACS").is_ok()
        || std::env::var("NO_COLOR").is_ok()
        || std::env::var("CARGO_TERM_COLOR").as_deref() == Ok("never")
        || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_ansi(!no_color))
        .with(LogRingLayer::new(ring))
        .init();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
