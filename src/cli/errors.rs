//! CLI-specific error types
//!
//! Every error is reported as one JSON object on stdout and ends the
//! process with a non-zero status.

use std::fmt;
use std::io;
use std::path::Path;

use crate::config::ConfigError;
use crate::library::LibraryError;
use crate::persistence::PersistenceError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout, runtime, signals)
    IoError,
    /// Data file already present
    AlreadyInitialized,
    /// Unknown book, member or backup
    NotFound,
    /// Operation refused by the circulation rules
    Rejected,
    /// Snapshot could not be saved or read
    PersistenceError,
    /// Replacement state breaks the circulation invariants
    InvalidState,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "LIB_CLI_CONFIG_ERROR",
            Self::IoError => "LIB_CLI_IO_ERROR",
            Self::AlreadyInitialized => "LIB_CLI_ALREADY_INITIALIZED",
            Self::NotFound => "LIB_CLI_NOT_FOUND",
            Self::Rejected => "LIB_CLI_REJECTED",
            Self::PersistenceError => "LIB_CLI_PERSISTENCE_ERROR",
            Self::InvalidState => "LIB_CLI_INVALID_STATE",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn already_initialized(data_file: &Path) -> Self {
        Self::new(
            CliErrorCode::AlreadyInitialized,
            format!("Data file {} already exists", data_file.display()),
        )
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::NotFound, msg)
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::Rejected, msg)
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::PersistenceError, msg)
    }

    /// Get the error code
    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<PersistenceError> for CliError {
    fn from(e: PersistenceError) -> Self {
        Self::persistence(e.to_string())
    }
}

impl From<LibraryError> for CliError {
    fn from(e: LibraryError) -> Self {
        let message = e.to_string();
        match e {
            LibraryError::Persistence(e) => e.into(),
            LibraryError::Config(e) => e.into(),
            LibraryError::InconsistentSnapshot(_) => {
                Self::new(CliErrorCode::InvalidState, message)
            }
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
