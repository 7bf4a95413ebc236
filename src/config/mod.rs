//! Configuration file
//!
//! A single JSON object; every key is optional:
//!
//! ```json
//! {
//!   "data_dir": "library_data",
//!   "data_file": "library_data.json",
//!   "backup_dir": "backups",
//!   "max_backups": 5,
//!   "auto_backup": true,
//!   "loan_days": 14,
//!   "alert_days_before": 3,
//!   "alert_interval_secs": 3600
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alerts::AlertPolicy;
use crate::library::LoanPolicy;
use crate::persistence::{
    StoreOptions, DEFAULT_BACKUP_DIR, DEFAULT_DATA_DIR, DEFAULT_DATA_FILE, DEFAULT_MAX_BACKUPS,
};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Library configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Directory holding the live snapshot and backups
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Live snapshot file name inside `data_dir`
    #[serde(default = "default_data_file")]
    pub data_file: String,

    /// Backup directory; relative to `data_dir` unless absolute
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Number of backups retained (>= 1)
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    /// Copy the live file aside before every save
    #[serde(default = "default_true")]
    pub auto_backup: bool,

    /// Loan period in days (>= 1)
    #[serde(default = "default_loan_days")]
    pub loan_days: u32,

    /// Alert when a book is due within this many days
    #[serde(default = "default_alert_days_before")]
    pub alert_days_before: u32,

    /// Seconds between alert scans (>= 1)
    #[serde(default = "default_alert_interval_secs")]
    pub alert_interval_secs: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}
fn default_data_file() -> String {
    DEFAULT_DATA_FILE.to_string()
}
fn default_backup_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BACKUP_DIR)
}
fn default_max_backups() -> usize {
    DEFAULT_MAX_BACKUPS
}
fn default_true() -> bool {
    true
}
fn default_loan_days() -> u32 {
    14
}
fn default_alert_days_before() -> u32 {
    3
}
fn default_alert_interval_secs() -> u64 {
    3600
} // hourly

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            data_file: default_data_file(),
            backup_dir: default_backup_dir(),
            max_backups: default_max_backups(),
            auto_backup: true,
            loan_days: default_loan_days(),
            alert_days_before: default_alert_days_before(),
            alert_interval_secs: default_alert_interval_secs(),
        }
    }
}

impl LibraryConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &content)
    }

    /// Like `load`, but a missing file means defaults
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_json(path, &content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn from_json(path: &Path, content: &str) -> ConfigResult<Self> {
        let config: LibraryConfig =
            serde_json::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Write this configuration as pretty JSON
    pub fn write(&self, path: &Path) -> ConfigResult<()> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("cannot encode config: {}", e)))?;
        content.push('\n');
        fs::write(path, content).map_err(write_err)
    }

    /// Reject values the core cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.data_file.trim().is_empty() {
            return Err(ConfigError::Invalid("data_file must not be empty".into()));
        }
        if Path::new(&self.data_file).components().count() != 1 {
            return Err(ConfigError::Invalid(format!(
                "data_file must be a plain file name, got '{}'",
                self.data_file
            )));
        }
        if self.max_backups == 0 {
            return Err(ConfigError::Invalid("max_backups must be >= 1".into()));
        }
        if self.loan_days == 0 {
            return Err(ConfigError::Invalid("loan_days must be >= 1".into()));
        }
        if self.alert_interval_secs == 0 {
            return Err(ConfigError::Invalid("alert_interval_secs must be >= 1".into()));
        }
        Ok(())
    }

    /// Persistence settings
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            data_dir: self.data_dir.clone(),
            data_file: self.data_file.clone(),
            backup_dir: self.backup_dir.clone(),
            max_backups: self.max_backups,
            auto_backup: self.auto_backup,
        }
    }

    /// Circulation settings
    pub fn loan_policy(&self) -> LoanPolicy {
        LoanPolicy {
            loan_days: self.loan_days,
        }
    }

    /// Alert scanner settings
    pub fn alert_policy(&self) -> AlertPolicy {
        AlertPolicy {
            days_before: self.alert_days_before,
            interval: Duration::from_secs(self.alert_interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = LibraryConfig::default();
        assert_eq!(config.loan_days, 14);
        assert_eq!(config.alert_days_before, 3);
        assert_eq!(config.alert_interval_secs, 3600);
        assert_eq!(config.max_backups, 5);
        assert!(config.auto_backup);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_object_is_all_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("circulation.json");
        fs::write(&path, "{}").unwrap();

        assert_eq!(LibraryConfig::load(&path).unwrap(), LibraryConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("circulation.json");
        fs::write(&path, r#"{"loan_days": 21, "data_dir": "/srv/library"}"#).unwrap();

        let config = LibraryConfig::load(&path).unwrap();
        assert_eq!(config.loan_days, 21);
        assert_eq!(config.data_dir, PathBuf::from("/srv/library"));
        assert_eq!(config.alert_days_before, 3);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");

        assert!(matches!(
            LibraryConfig::load(&path),
            Err(ConfigError::Read { .. })
        ));
        assert_eq!(
            LibraryConfig::load_or_default(&path).unwrap(),
            LibraryConfig::default()
        );
    }

    #[test]
    fn test_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("circulation.json");
        fs::write(&path, "{loan_days: 3").unwrap();

        assert!(matches!(
            LibraryConfig::load_or_default(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_validation() {
        let zero_loan = LibraryConfig {
            loan_days: 0,
            ..LibraryConfig::default()
        };
        assert!(zero_loan.validate().is_err());

        let no_backups = LibraryConfig {
            max_backups: 0,
            ..LibraryConfig::default()
        };
        assert!(no_backups.validate().is_err());

        let nested_file = LibraryConfig {
            data_file: "sub/library.json".into(),
            ..LibraryConfig::default()
        };
        assert!(nested_file.validate().is_err());
    }

    #[test]
    fn test_write_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("circulation.json");
        let config = LibraryConfig {
            loan_days: 7,
            auto_backup: false,
            ..LibraryConfig::default()
        };

        config.write(&path).unwrap();
        assert_eq!(LibraryConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_typed_views() {
        let config = LibraryConfig::default();
        assert_eq!(config.loan_policy().loan_days, 14);
        assert_eq!(config.alert_policy().interval, Duration::from_secs(3600));
        assert_eq!(config.store_options().max_backups, 5);
    }
}
