//! Persistence gateway
//!
//! The whole library state is written as one self-describing JSON document.
//!
//! # Guarantees
//!
//! - A save either fully replaces the live file or leaves it untouched
//! - The previous live file is kept as a timestamped backup (optional)
//! - Only the newest `max_backups` backups are retained
//! - Backup and retention failures never fail a save
//!
//! # Important
//!
//! This is not a transaction log. Every save rewrites the full snapshot.

mod backup;
mod durable;
mod errors;
mod store;

pub use backup::{BackupNaming, TIMESTAMP_FORMAT};
pub use errors::{PersistenceError, PersistenceErrorCode, PersistenceResult};
pub use store::{
    DataStore, StoreOptions, DEFAULT_BACKUP_DIR, DEFAULT_DATA_DIR, DEFAULT_DATA_FILE,
    DEFAULT_MAX_BACKUPS,
};

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::model::LibrarySnapshot;

/// Where the registry writes its snapshots.
///
/// `save` is called synchronously after every state-changing operation,
/// while the registry lock is held.
pub trait SnapshotStore: Send + Sync {
    /// Durably replace the stored snapshot
    fn save(&self, snapshot: &LibrarySnapshot) -> PersistenceResult<()>;

    /// Read the stored snapshot; absent state is an empty snapshot
    fn load(&self) -> PersistenceResult<LibrarySnapshot>;

    /// Human-readable location for logs
    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// In-process store keeping the last saved snapshot.
///
/// Useful for tests and throwaway libraries. Saves can be made to fail to
/// exercise the degraded auto-save path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<Option<LibrarySnapshot>>,
    saves: AtomicU64,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose `load` returns `snapshot`
    pub fn with_snapshot(snapshot: LibrarySnapshot) -> Self {
        Self {
            saved: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// Number of successful saves
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Last successfully saved snapshot
    pub fn last_saved(&self) -> Option<LibrarySnapshot> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make subsequent saves fail (or succeed again)
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&self, snapshot: &LibrarySnapshot) -> PersistenceResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::io_error(
                "Simulated save failure",
                io::Error::new(io::ErrorKind::Other, "memory store set to fail"),
            ));
        }
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self) -> PersistenceResult<LibrarySnapshot> {
        Ok(self.last_saved().unwrap_or_default())
    }
}
