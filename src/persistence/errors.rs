//! Persistence error types
//!
//! Error codes:
//! - LIB_PERSIST_IO: the filesystem refused a read, write, rename or listing
//! - LIB_PERSIST_CORRUPT: a file exists but does not decode as a snapshot
//! - LIB_PERSIST_NOT_FOUND: an explicitly requested file does not exist
//! - LIB_PERSIST_SERIALIZE: the in-memory state could not be encoded
//!
//! All persistence errors are recoverable; the in-memory library keeps
//! working when the disk does not.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::Path;

/// Persistence error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceErrorCode {
    /// I/O failure
    Io,
    /// Unparseable snapshot document
    Corrupt,
    /// Requested backup or import file missing
    NotFound,
    /// Snapshot encoding failure
    Serialize,
}

impl PersistenceErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PersistenceErrorCode::Io => "LIB_PERSIST_IO",
            PersistenceErrorCode::Corrupt => "LIB_PERSIST_CORRUPT",
            PersistenceErrorCode::NotFound => "LIB_PERSIST_NOT_FOUND",
            PersistenceErrorCode::Serialize => "LIB_PERSIST_SERIALIZE",
        }
    }
}

impl fmt::Display for PersistenceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Persistence error with code, message and optional cause
#[derive(Debug)]
pub struct PersistenceError {
    code: PersistenceErrorCode,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl PersistenceError {
    fn new(code: PersistenceErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// I/O failure with its cause
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(PersistenceErrorCode::Io, message)
        }
    }

    /// I/O failure at a path
    pub fn io_error_at_path(path: &Path, source: io::Error) -> Self {
        Self::io_error(format!("I/O error at path: {}", path.display()), source)
    }

    /// Unparseable document at a path
    pub fn corrupt(path: &Path, source: serde_json::Error) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(
                PersistenceErrorCode::Corrupt,
                format!("Corrupt snapshot file: {}", path.display()),
            )
        }
    }

    /// Missing file the caller asked for by name
    pub fn not_found(path: &Path) -> Self {
        Self::new(
            PersistenceErrorCode::NotFound,
            format!("File not found: {}", path.display()),
        )
    }

    /// State could not be encoded
    pub fn serialize(source: serde_json::Error) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(PersistenceErrorCode::Serialize, "Failed to encode snapshot")
        }
    }

    /// Backup name that is not a plain file name
    pub fn invalid_backup_name(name: &str) -> Self {
        Self::new(
            PersistenceErrorCode::NotFound,
            format!("Not a backup name: {}", name),
        )
    }

    pub fn code(&self) -> PersistenceErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)?;
        if let Some(ref source) = self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl StdError for PersistenceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;
