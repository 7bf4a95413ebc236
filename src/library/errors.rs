//! Registry-level errors
//!
//! Domain outcomes (unknown book, unavailable copy) are return values, not
//! errors. Only storage, configuration and rejected state replacement end up
//! here.

use thiserror::Error;

use crate::config::ConfigError;
use crate::persistence::PersistenceError;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Snapshot violates circulation invariants: {}", .0.join("; "))]
    InconsistentSnapshot(Vec<String>),
}

pub type LibraryResult<T> = Result<T, LibraryError>;
