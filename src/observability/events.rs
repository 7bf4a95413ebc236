//! Observable events for the circulation core
//!
//! Events are explicit and typed; the logger only ever sees their names.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Library opened and state loaded
    LibraryOpened,
    /// Shutdown initiated
    ShutdownStart,
    /// Shutdown complete, final flush done
    ShutdownComplete,

    // Load
    /// Persisted state loaded
    StateLoaded,
    /// No usable persisted state, starting empty
    StateEmpty,
    /// Persisted state unreadable, starting empty
    StateDegraded,
    /// Loaded state violates circulation invariants
    StateInconsistent,
    /// An id sequence reached the top of its range
    IdSequenceExhausted,

    // Save / backup
    /// Snapshot written to the live file
    SaveComplete,
    /// Snapshot write failed
    SaveFailed,
    /// Backup of the live file created
    BackupCreated,
    /// Backup could not be created
    BackupFailed,
    /// Old backup removed by retention
    BackupPruned,
    /// Retention pass failed
    BackupPruneFailed,

    // Restore / interchange
    /// State replaced from a backup or import
    RestoreComplete,
    /// Snapshot exported to a caller-chosen path
    ExportComplete,
    /// Snapshot imported from a caller-chosen path
    ImportComplete,

    // Catalog and members
    /// Book added to the catalog
    BookAdded,
    /// Book removed from the catalog
    BookRemoved,
    /// Member registered
    MemberAdded,
    /// Member removed
    MemberRemoved,
    /// Member removed while still holding books
    MemberRemovedWithLoans,
    /// Member marked active or inactive
    MemberStatusChanged,

    // Circulation
    /// Book checked out
    CheckoutComplete,
    /// Checkout refused
    CheckoutRejected,
    /// Book returned
    ReturnComplete,
    /// Member queued for a book
    ReservationQueued,
    /// Head of a reservation queue served
    ReservationServed,

    // Alerts
    /// Alert scheduler started
    SchedulerStarted,
    /// Alert scheduler stopped
    SchedulerStopped,
    /// One scan over outstanding books finished
    AlertScanComplete,
    /// A book is due soon
    DueDateAlert,
    /// A scan panicked or was cancelled
    AlertScanFailed,
}

impl Event {
    /// Returns the event name as logged
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::LibraryOpened => "LIBRARY_OPENED",
            Event::ShutdownStart => "SHUTDOWN_START",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::StateLoaded => "STATE_LOADED",
            Event::StateEmpty => "STATE_EMPTY",
            Event::StateDegraded => "STATE_DEGRADED",
            Event::StateInconsistent => "STATE_INCONSISTENT",
            Event::IdSequenceExhausted => "ID_SEQUENCE_EXHAUSTED",
            Event::SaveComplete => "SAVE_COMPLETE",
            Event::SaveFailed => "SAVE_FAILED",
            Event::BackupCreated => "BACKUP_CREATED",
            Event::BackupFailed => "BACKUP_FAILED",
            Event::BackupPruned => "BACKUP_PRUNED",
            Event::BackupPruneFailed => "BACKUP_PRUNE_FAILED",
            Event::RestoreComplete => "RESTORE_COMPLETE",
            Event::ExportComplete => "EXPORT_COMPLETE",
            Event::ImportComplete => "IMPORT_COMPLETE",
            Event::BookAdded => "BOOK_ADDED",
            Event::BookRemoved => "BOOK_REMOVED",
            Event::MemberAdded => "MEMBER_ADDED",
            Event::MemberRemoved => "MEMBER_REMOVED",
            Event::MemberRemovedWithLoans => "MEMBER_REMOVED_WITH_LOANS",
            Event::MemberStatusChanged => "MEMBER_STATUS_CHANGED",
            Event::CheckoutComplete => "CHECKOUT_COMPLETE",
            Event::CheckoutRejected => "CHECKOUT_REJECTED",
            Event::ReturnComplete => "RETURN_COMPLETE",
            Event::ReservationQueued => "RESERVATION_QUEUED",
            Event::ReservationServed => "RESERVATION_SERVED",
            Event::SchedulerStarted => "SCHEDULER_STARTED",
            Event::SchedulerStopped => "SCHEDULER_STOPPED",
            Event::AlertScanComplete => "ALERT_SCAN_COMPLETE",
            Event::DueDateAlert => "DUE_DATE_ALERT",
            Event::AlertScanFailed => "ALERT_SCAN_FAILED",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::SaveFailed
            | Event::BackupFailed
            | Event::BackupPruneFailed
            | Event::AlertScanFailed => Severity::Error,
            Event::StateDegraded
            | Event::StateInconsistent
            | Event::IdSequenceExhausted
            | Event::MemberRemovedWithLoans
            | Event::DueDateAlert => Severity::Warn,
            Event::SaveComplete
            | Event::BackupPruned
            | Event::CheckoutRejected
            | Event::AlertScanComplete => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
