//! File-backed snapshot store
//!
//! Layout under the data directory:
//!
//! ```text
//! library_data/
//! ├── library_data.json          live snapshot
//! ├── library_data.json.tmp      only during a save
//! └── backups/
//!     └── library_data_<yyyyMMdd_HHmmss>.json
//! ```
//!
//! `load` is forgiving because it runs at startup; `restore_from_backup` and
//! `import_from` are strict because the caller named the exact file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::model::LibrarySnapshot;
use crate::observability::{log_event, Event};

use super::backup::{create_backup, list_backups, prune_backups, BackupNaming};
use super::durable::write_atomic;
use super::errors::{PersistenceError, PersistenceResult};
use super::SnapshotStore;

/// Default data directory
pub const DEFAULT_DATA_DIR: &str = "library_data";
/// Default live file name
pub const DEFAULT_DATA_FILE: &str = "library_data.json";
/// Default backup directory, relative to the data directory
pub const DEFAULT_BACKUP_DIR: &str = "backups";
/// Default number of backups kept
pub const DEFAULT_MAX_BACKUPS: usize = 5;

/// Where and how snapshots are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub data_dir: PathBuf,
    pub data_file: String,
    /// Relative paths are resolved against `data_dir`
    pub backup_dir: PathBuf,
    pub max_backups: usize,
    pub auto_backup: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            data_file: DEFAULT_DATA_FILE.to_string(),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            max_backups: DEFAULT_MAX_BACKUPS,
            auto_backup: true,
        }
    }
}

impl StoreOptions {
    /// Defaults rooted at `data_dir`
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }
}

/// The persistence gateway: one live snapshot file plus rotating backups.
#[derive(Debug)]
pub struct DataStore {
    data_file: PathBuf,
    backup_dir: PathBuf,
    naming: BackupNaming,
    max_backups: usize,
    auto_backup: bool,
}

impl DataStore {
    /// Set up the store, creating its directories.
    ///
    /// Directory creation failures are logged, not returned: the first save
    /// will report the real problem.
    pub fn open(options: StoreOptions) -> Self {
        let data_file = options.data_dir.join(&options.data_file);
        let backup_dir = if options.backup_dir.is_absolute() {
            options.backup_dir.clone()
        } else {
            options.data_dir.join(&options.backup_dir)
        };

        for dir in [&options.data_dir, &backup_dir] {
            if let Err(e) = fs::create_dir_all(dir) {
                log_event(
                    Event::SaveFailed,
                    &[
                        ("path", &dir.display().to_string()),
                        ("reason", &format!("cannot create directory: {}", e)),
                    ],
                );
            }
        }

        Self {
            naming: BackupNaming::for_file(&data_file),
            data_file,
            backup_dir,
            max_backups: options.max_backups,
            auto_backup: options.auto_backup,
        }
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Whether a live snapshot file exists
    pub fn data_file_exists(&self) -> bool {
        self.data_file.is_file()
    }

    /// Size of the live snapshot file in bytes
    pub fn data_file_size(&self) -> Option<u64> {
        fs::metadata(&self.data_file).ok().map(|m| m.len())
    }

    /// Write `snapshot` as the new live file.
    ///
    /// With auto-backup on, the previous live file is copied into the backup
    /// directory first and old backups are pruned afterwards. Backup trouble
    /// is logged and never fails the save.
    pub fn save(&self, snapshot: &LibrarySnapshot) -> PersistenceResult<()> {
        let bytes = encode(snapshot)?;

        if self.auto_backup && self.data_file.is_file() {
            self.backup_live_file();
        }

        write_atomic(&self.data_file, &bytes)?;
        log_event(
            Event::SaveComplete,
            &[
                ("path", &self.data_file.display().to_string()),
                ("bytes", &bytes.len().to_string()),
            ],
        );

        if self.auto_backup {
            self.prune();
        }
        Ok(())
    }

    fn backup_live_file(&self) {
        let now = Local::now().naive_local();
        match create_backup(&self.data_file, &self.backup_dir, &self.naming, now) {
            Ok(name) => log_event(Event::BackupCreated, &[("backup", &name)]),
            Err(e) => log_event(Event::BackupFailed, &[("error", &e.to_string())]),
        }
    }

    fn prune(&self) {
        match prune_backups(&self.backup_dir, &self.naming, self.max_backups) {
            Ok(removed) => {
                for name in removed {
                    log_event(Event::BackupPruned, &[("backup", &name)]);
                }
            }
            Err(e) => log_event(Event::BackupPruneFailed, &[("error", &e.to_string())]),
        }
    }

    /// Read the live snapshot.
    ///
    /// A missing, blank or undecodable file yields an empty snapshot. Only a
    /// file that exists but cannot be read is an error, since saving over it
    /// would destroy data we never looked at.
    pub fn load(&self) -> PersistenceResult<LibrarySnapshot> {
        let path = self.data_file.display().to_string();
        let contents = match fs::read_to_string(&self.data_file) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log_event(Event::StateEmpty, &[("path", &path), ("reason", "absent")]);
                return Ok(LibrarySnapshot::new());
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                log_event(
                    Event::StateDegraded,
                    &[("path", &path), ("error", &e.to_string())],
                );
                return Ok(LibrarySnapshot::new());
            }
            Err(e) => return Err(PersistenceError::io_error_at_path(&self.data_file, e)),
        };

        if contents.trim().is_empty() {
            log_event(Event::StateEmpty, &[("path", &path), ("reason", "empty")]);
            return Ok(LibrarySnapshot::new());
        }

        match serde_json::from_str::<LibrarySnapshot>(&contents) {
            Ok(snapshot) => {
                log_event(
                    Event::StateLoaded,
                    &[
                        ("path", &path),
                        ("books", &snapshot.books.len().to_string()),
                        ("members", &snapshot.members.len().to_string()),
                    ],
                );
                Ok(snapshot)
            }
            Err(e) => {
                log_event(
                    Event::StateDegraded,
                    &[("path", &path), ("error", &e.to_string())],
                );
                Ok(LibrarySnapshot::new())
            }
        }
    }

    /// Backup names, newest first
    pub fn list_backups(&self) -> PersistenceResult<Vec<String>> {
        list_backups(&self.backup_dir, &self.naming)
    }

    /// Read a named backup. Missing or corrupt backups are errors.
    pub fn restore_from_backup(&self, name: &str) -> PersistenceResult<LibrarySnapshot> {
        let is_plain_name = !name.is_empty()
            && !name.contains(['/', '\\'])
            && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
        if !is_plain_name {
            return Err(PersistenceError::invalid_backup_name(name));
        }
        read_snapshot_file(&self.backup_dir.join(name))
    }

    /// Write `snapshot` to an arbitrary location
    pub fn export_to(&self, path: &Path, snapshot: &LibrarySnapshot) -> PersistenceResult<()> {
        let bytes = encode(snapshot)?;
        write_atomic(path, &bytes)?;
        log_event(
            Event::ExportComplete,
            &[("path", &path.display().to_string())],
        );
        Ok(())
    }

    /// Read a snapshot from an arbitrary location. Missing or corrupt files
    /// are errors.
    pub fn import_from(&self, path: &Path) -> PersistenceResult<LibrarySnapshot> {
        let snapshot = read_snapshot_file(path)?;
        log_event(
            Event::ImportComplete,
            &[("path", &path.display().to_string())],
        );
        Ok(snapshot)
    }
}

impl SnapshotStore for DataStore {
    fn save(&self, snapshot: &LibrarySnapshot) -> PersistenceResult<()> {
        DataStore::save(self, snapshot)
    }

    fn load(&self) -> PersistenceResult<LibrarySnapshot> {
        DataStore::load(self)
    }

    fn describe(&self) -> String {
        self.data_file.display().to_string()
    }
}

fn encode(snapshot: &LibrarySnapshot) -> PersistenceResult<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(snapshot).map_err(PersistenceError::serialize)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn read_snapshot_file(path: &Path) -> PersistenceResult<LibrarySnapshot> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(PersistenceError::not_found(path))
        }
        Err(e) => return Err(PersistenceError::io_error_at_path(path, e)),
    };
    serde_json::from_str(&contents).map_err(|e| PersistenceError::corrupt(path, e))
}
