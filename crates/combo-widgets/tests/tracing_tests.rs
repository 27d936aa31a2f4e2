#![forbid(unsafe_code)]

//! Tracing instrumentation tests.
//!
//! Verifies the `widget_event` and `combo_filter` spans and the warn-level
//! event emitted when an async source fails.
//!
//!   cargo test -p combo-widgets --test tracing_tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use combo_core::event::{Event, KeyCode};
use combo_widgets::option::string_options;
use combo_widgets::{ComboBox, ComboBoxConfig, MultiComboBox, OptionSource, SourceError};
use futures::executor::block_on;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

// ============================================================================
// Test Infrastructure
// ============================================================================

/// A captured span with its fields and parent.
#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
    parent_name: Option<String>,
}

/// A captured event (log line).
#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    fields: HashMap<String, String>,
}

/// A tracing Layer that records spans and events.
struct SpanCapture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl SpanCapture {
    fn new() -> (Self, CaptureHandle) {
        let spans = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(Mutex::new(Vec::new()));
        let handle = CaptureHandle {
            spans: spans.clone(),
            events: events.clone(),
        };
        (Self { spans, events }, handle)
    }
}

/// Handle to read captured data after the closure ran.
struct CaptureHandle {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureHandle {
    fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().clone()
    }

    fn spans_named(&self, name: &str) -> Vec<CapturedSpan> {
        self.spans().into_iter().filter(|s| s.name == name).collect()
    }

    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }
}

/// Visitor that extracts fields.
struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for SpanCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);

        let parent_name = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span_ref| span_ref.name().to_string());

        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
            parent_name,
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields: visitor.0.into_iter().collect(),
        });
    }
}

/// Set up a tracing subscriber with capture and run a closure.
fn with_captured_spans<F>(f: F) -> CaptureHandle
where
    F: FnOnce(),
{
    let (layer, handle) = SpanCapture::new();
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    handle
}

fn fruit() -> Vec<combo_widgets::SelectOption<String>> {
    string_options([("Apple", "apple"), ("Banana", "banana"), ("Cherry", "cherry")])
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn widget_event_span_per_event() {
    let handle = with_captured_spans(|| {
        let mut combo = ComboBox::new(fruit(), ComboBoxConfig::default());
        combo.handle_event(&Event::key(KeyCode::Down));
        combo.handle_event(&Event::key(KeyCode::Escape));
    });

    let spans = handle.spans_named("widget_event");
    assert_eq!(spans.len(), 2);
    assert!(
        spans
            .iter()
            .all(|s| s.fields.get("widget").map(String::as_str) == Some("ComboBox"))
    );
}

#[test]
fn multi_widget_is_named() {
    let handle = with_captured_spans(|| {
        let mut combo = MultiComboBox::new(fruit(), ComboBoxConfig::default());
        combo.handle_event(&Event::Focus(true));
    });

    let spans = handle.spans_named("widget_event");
    assert_eq!(spans.len(), 1);
    assert_eq!(
        spans[0].fields.get("widget").map(String::as_str),
        Some("MultiComboBox")
    );
}

#[test]
fn filter_span_nested_in_event_span() {
    let handle = with_captured_spans(|| {
        let mut combo = ComboBox::new(fruit(), ComboBoxConfig::default());
        combo.handle_event(&Event::key(KeyCode::Char('a')));
    });

    let filters = handle.spans_named("combo_filter");
    // One at construction, one for the keystroke.
    assert_eq!(filters.len(), 2);
    let keystroke = &filters[1];
    assert_eq!(keystroke.parent_name.as_deref(), Some("widget_event"));
    assert_eq!(keystroke.fields.get("options").map(String::as_str), Some("3"));
    assert_eq!(keystroke.fields.get("query_len").map(String::as_str), Some("1"));
    assert_eq!(filters[0].parent_name, None);
}

#[test]
fn async_sources_do_not_open_filter_spans() {
    let handle = with_captured_spans(|| {
        let source = OptionSource::from_fn(|_query: String| async { Ok(Vec::new()) });
        let mut combo: ComboBox<String> = ComboBox::new(source, ComboBoxConfig::default());
        combo.handle_event(&Event::key(KeyCode::Char('a')));
    });
    assert!(handle.spans_named("combo_filter").is_empty());
}

#[test]
fn failed_fetch_logs_warning() {
    let handle = with_captured_spans(|| {
        let source = OptionSource::from_fn(|_query: String| async {
            Err::<Vec<_>, _>(SourceError::msg("backend down"))
        });
        let mut combo: ComboBox<String> = ComboBox::new(source, ComboBoxConfig::default());
        let now = Instant::now();
        combo.open_at(now);
        let ticket = combo.poll_fetch_at(now).expect("lookup issued");
        combo.complete_fetch(block_on(ticket.resolve()));
    });

    let warnings: Vec<_> = handle
        .events()
        .into_iter()
        .filter(|e| e.level == tracing::Level::WARN)
        .collect();
    assert_eq!(warnings.len(), 1);
    let error = warnings[0].fields.get("error").expect("error field");
    assert!(error.contains("backend down"), "got {error}");
}

#[test]
fn no_subscriber_is_fine() {
    let mut combo = ComboBox::new(fruit(), ComboBoxConfig::default());
    combo.handle_event(&Event::key(KeyCode::Down));
    assert!(combo.is_open());
}
