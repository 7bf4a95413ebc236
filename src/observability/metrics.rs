//! Circulation counters
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one `Library`
///
/// Relaxed ordering throughout; counters are read for reporting only.
#[derive(Debug, Default)]
pub struct LibraryMetrics {
    checkouts: AtomicU64,
    checkouts_rejected: AtomicU64,
    returns: AtomicU64,
    reservations: AtomicU64,
    saves: AtomicU64,
    save_failures: AtomicU64,
    alert_scans: AtomicU64,
    alerts_delivered: AtomicU64,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub checkouts: u64,
    pub checkouts_rejected: u64,
    pub returns: u64,
    pub reservations: u64,
    pub saves: u64,
    pub save_failures: u64,
    pub alert_scans: u64,
    pub alerts_delivered: u64,
}

impl LibraryMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_checkouts(&self) {
        self.checkouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_checkouts_rejected(&self) {
        self.checkouts_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_returns(&self) {
        self.returns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reservations(&self) {
        self.reservations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_saves(&self) {
        self.saves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_save_failures(&self) {
        self.save_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_alert_scans(&self) {
        self.alert_scans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_alerts_delivered(&self, count: u64) {
        self.alerts_delivered.fetch_add(count, Ordering::Relaxed);
    }

    /// Number of alert scans run so far
    pub fn alert_scans(&self) -> u64 {
        self.alert_scans.load(Ordering::Relaxed)
    }

    /// Number of failed auto-saves so far
    pub fn save_failures(&self) -> u64 {
        self.save_failures.load(Ordering::Relaxed)
    }

    /// Take a snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            checkouts: self.checkouts.load(Ordering::Relaxed),
            checkouts_rejected: self.checkouts_rejected.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            reservations: self.reservations.load(Ordering::Relaxed),
            saves: self.saves.load(Ordering::Relaxed),
            save_failures: self.save_failures.load(Ordering::Relaxed),
            alert_scans: self.alert_scans.load(Ordering::Relaxed),
            alerts_delivered: self.alerts_delivered.load(Ordering::Relaxed),
        }
    }

    /// Render the snapshot as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}
