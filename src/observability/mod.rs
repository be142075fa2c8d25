//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle and operation events
//! - Operation counters
//!
//! Observability is read-only: nothing here changes store behaviour, and a
//! failure to write a log line is ignored.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity, LOG_ENV};
pub use metrics::{MetricsSnapshot, StoreMetrics};

/// Log a lifecycle event with fields
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

/// Log a per-operation event at TRACE
pub fn trace_event(event: Event, fields: &[(&str, &str)]) {
    Logger::trace(event.as_str(), fields);
}

/// Log an anomaly the caller recovered from
pub fn warn_event(event: Event, fields: &[(&str, &str)]) {
    Logger::warn(event.as_str(), fields);
}
