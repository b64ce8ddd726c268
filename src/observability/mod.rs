//! Observability
//!
//! - Structured JSON-line logging of typed events
//! - Injected read/write counters ([`ObservabilitySink`])
//! - Begin/complete scopes around blocking waits
//!
//! Observability never changes the outcome of the operation it watches.
//!
//! ```ignore
//! use solrset::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::DocumentCreated, &[("bucket", "people"), ("key", "k1")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{NoopSink, ObservabilitySink, StatCounters, StatsSnapshot};
pub use scope::{ObservationScope, Timer};

/// Log an event at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
