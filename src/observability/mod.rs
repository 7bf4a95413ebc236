//! Observability for the circulation core
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle and circulation events
//! - Atomic counters
//!
//! Observability never changes the outcome of an operation: logging
//! failures are swallowed and counters are write-only from the hot path.
//!
//! ```ignore
//! use circulation::observability::{log_event, Event};
//!
//! log_event(Event::BookAdded, &[("book_id", "B100")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity, LOG_LEVEL_ENV};
pub use metrics::{LibraryMetrics, MetricsSnapshot};

/// Log a typed event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
