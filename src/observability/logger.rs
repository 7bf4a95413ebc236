//! Structured JSON logger
//!
//! - One log line = one JSON object
//! - Keys sorted, `event`, `severity` and `ts` always present
//! - Synchronous, no buffering
//! - Written to stderr; stdout belongs to command output

use std::fmt;
use std::io::{self, Write};
use std::sync::OnceLock;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

/// Environment variable holding the minimum severity that gets written.
pub const LOG_LEVEL_ENV: &str = "CIRCULATION_LOG";

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues, degraded behavior
    Warn = 2,
    /// Operation failures
    Error = 3,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    /// Parse a level name, case-insensitive.
    pub fn parse(level: &str) -> Option<Self> {
        match level.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Severity::Trace),
            "info" => Some(Severity::Info),
            "warn" | "warning" => Some(Severity::Warn),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimum severity, read once from the environment.
fn threshold() -> Severity {
    static THRESHOLD: OnceLock<Severity> = OnceLock::new();
    *THRESHOLD.get_or_init(|| {
        std::env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|level| Severity::parse(&level))
            .unwrap_or(Severity::Info)
    })
}

/// A structured logger that outputs JSON lines
pub struct Logger;

impl Logger {
    /// Log an event with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if severity < threshold() {
            return;
        }
        Self::log_to_writer(severity, event, fields, &mut io::stderr().lock());
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut line = render(severity, event, fields, &ts);
        line.push('\n');

        // Logging must never take the caller down.
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}

/// Build one log record. Reserved keys win over caller fields of the same name.
fn render(severity: Severity, event: &str, fields: &[(&str, &str)], ts: &str) -> String {
    let mut record = Map::new();
    for (key, value) in fields {
        record.insert((*key).to_string(), Value::String((*value).to_string()));
    }
    record.insert("event".to_string(), Value::String(event.to_string()));
    record.insert(
        "severity".to_string(),
        Value::String(severity.as_str().to_string()),
    );
    record.insert("ts".to_string(), Value::String(ts.to_string()));
    Value::Object(record).to_string()
}
