//! Logging helpers for tests.
//!
//! [`init_test_logging`] installs a global `tracing` subscriber that writes
//! through the test harness. [`capture_logs`] records the events emitted
//! while a closure runs so tests can assert on them.
//!
//! # Example
//!
//! ```rust
//! use trellis::{Node, NodeConfig};
//! use trellis_test::{capture_logs, RecordingRegistrar};
//!
//! let node = Node::new(NodeConfig::new().path("/hello").method("get").handler(1)).unwrap();
//! let mut server = RecordingRegistrar::new();
//!
//! let (result, events) = capture_logs(|| node.attach(&mut server));
//! result.unwrap();
//!
//! let event = events.iter().find(|e| e.message() == Some("Attaching route")).unwrap();
//! assert_eq!(event.field("http.method"), Some("GET"));
//! assert_eq!(event.field("http.path"), Some("/hello"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Once};

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{EnvFilter, Layer};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_TEST_FILTER: &str = "warn";

/// Installs a global subscriber writing to the test output.
///
/// Honors `RUST_LOG`, falling back to [`DEFAULT_TEST_FILTER`]. Safe to call
/// from every test; only the first call has an effect.
pub fn init_test_logging() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_FILTER));

        // another harness may have installed a subscriber already
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// An event recorded by [`capture_logs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    /// Event level.
    pub level: Level,
    /// Module path that emitted the event.
    pub target: String,
    /// Recorded fields, `message` included.
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    /// Returns the event message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.field("message")
    }

    /// Returns a field rendered as a string.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Runs `f` with a subscriber that records every event on this thread.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, Vec<CapturedEvent>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = CaptureLayer {
        events: Arc::clone(&events),
    };
    let subscriber = tracing_subscriber::registry().with(layer);

    let output = tracing::subscriber::with_default(subscriber, f);

    let captured = std::mem::take(&mut *events.lock());
    (output, captured)
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.events.lock().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    fields: BTreeMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{value:?}"));
    }
}
