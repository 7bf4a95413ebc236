//! Due-date alerts
//!
//! A scan is a pure function of the state and a date. The scheduler runs it
//! periodically and hands each alert to an `AlertSink`. Runs are stateless:
//! a loan due in two days is reported again on the next run.

mod scheduler;

pub use scheduler::{AlertScheduler, AlertSchedulerHandle};

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use crate::library::Library;
use crate::model::{BookId, LibrarySnapshot, MemberId};
use crate::observability::{log_event, Event};

/// Default alert window in days
pub const DEFAULT_DAYS_BEFORE: u32 = 3;
/// Default time between scans
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(3600);

/// When and how far ahead to scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
    pub days_before: u32,
    pub interval: Duration,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            days_before: DEFAULT_DAYS_BEFORE,
            interval: DEFAULT_SCAN_INTERVAL,
        }
    }
}

/// A loan coming due
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueAlert {
    pub book_id: BookId,
    pub title: String,
    pub member_id: MemberId,
    pub member_name: String,
    pub due_date: NaiveDate,
    pub days_until_due: i64,
}

impl fmt::Display for DueAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ALERT: {} is due in {} days for {}",
            self.title, self.days_until_due, self.member_name
        )
    }
}

/// Loans due between `today` and `today + days_before`, inclusive.
///
/// Overdue loans and loans of members no longer registered are skipped.
pub fn scan_due_alerts(
    snapshot: &LibrarySnapshot,
    today: NaiveDate,
    days_before: u32,
) -> Vec<DueAlert> {
    let window = 0..=i64::from(days_before);

    snapshot
        .outstanding()
        .filter_map(|book| {
            let due_date = book.due_date()?;
            let days_until_due = book.days_until_due(today)?;
            if !window.contains(&days_until_due) {
                return None;
            }
            let member = snapshot.members.get(book.current_borrower_id()?)?;
            Some(DueAlert {
                book_id: book.id().clone(),
                title: book.title().to_string(),
                member_id: member.id().clone(),
                member_name: member.name().to_string(),
                due_date,
                days_until_due,
            })
        })
        .collect()
}

/// Receives alerts produced by a scan
pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: &DueAlert);
}

/// Writes each alert as a `DUE_DATE_ALERT` warning
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn deliver(&self, alert: &DueAlert) {
        log_event(
            Event::DueDateAlert,
            &[
                ("book_id", alert.book_id.as_str()),
                ("member_id", alert.member_id.as_str()),
                ("due_date", &alert.due_date.to_string()),
                ("days_until_due", &alert.days_until_due.to_string()),
                ("message", &alert.to_string()),
            ],
        );
    }
}

/// Collects alerts in memory
#[derive(Debug, Default)]
pub struct MemoryAlertSink {
    alerts: Mutex<Vec<DueAlert>>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in delivery order
    pub fn alerts(&self) -> Vec<DueAlert> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertSink for MemoryAlertSink {
    fn deliver(&self, alert: &DueAlert) {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(alert.clone());
    }
}

/// One scan: collect alerts under the registry lock, then deliver them
/// after it is released. Returns the number delivered.
pub fn deliver_due_alerts(
    library: &Library,
    sink: &dyn AlertSink,
    today: NaiveDate,
    days_before: u32,
) -> usize {
    let alerts = library.due_alerts(today, days_before);
    for alert in &alerts {
        sink.deliver(alert);
    }

    let metrics = library.metrics();
    metrics.increment_alert_scans();
    metrics.add_alerts_delivered(alerts.len() as u64);
    log_event(
        Event::AlertScanComplete,
        &[
            ("today", &today.to_string()),
            ("alerts", &alerts.len().to_string()),
        ],
    );
    alerts.len()
}
