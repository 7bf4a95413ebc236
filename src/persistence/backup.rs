//! Timestamped backups of the live snapshot file
//!
//! Backup names are `<stem>_<yyyyMMdd_HHmmss>.<ext>`. A second backup within
//! the same second gets a `_NNN` counter (`..._120000_001.json`), which still
//! sorts after the plain name, so lexicographic order is creation order.

use std::fs;
use std::io;
use std::path::Path;

use chrono::NaiveDateTime;

use super::durable::{copy_with_fsync, fsync_dir_best_effort};
use super::errors::{PersistenceError, PersistenceResult};

/// chrono format of the timestamp part
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const TIMESTAMP_LEN: usize = 15;
const MAX_SAME_SECOND: u32 = 999;

/// Naming scheme derived from the live file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupNaming {
    stem: String,
    extension: String,
}

impl BackupNaming {
    /// `library_data.json` gives `library_data_<ts>.json`
    pub fn for_file(data_file: &Path) -> Self {
        let stem = data_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "library_data".to_string());
        let extension = data_file
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "json".to_string());
        Self { stem, extension }
    }

    /// Backup name for a timestamp
    pub fn name_at(&self, at: NaiveDateTime) -> String {
        format!(
            "{}_{}.{}",
            self.stem,
            at.format(TIMESTAMP_FORMAT),
            self.extension
        )
    }

    fn name_with_counter(&self, at: NaiveDateTime, counter: u32) -> String {
        format!(
            "{}_{}_{:03}.{}",
            self.stem,
            at.format(TIMESTAMP_FORMAT),
            counter,
            self.extension
        )
    }

    fn counter_at(&self, name: &str, at: NaiveDateTime) -> Option<u32> {
        let prefix = format!("{}_{}_", self.stem, at.format(TIMESTAMP_FORMAT));
        let suffix = format!(".{}", self.extension);
        let digits = name.strip_prefix(prefix.as_str())?.strip_suffix(suffix.as_str())?;
        if digits.len() != 3 {
            return None;
        }
        digits.parse().ok()
    }

    /// Whether `name` is a backup produced by this scheme
    pub fn matches(&self, name: &str) -> bool {
        let Some(rest) = name
            .strip_prefix(self.stem.as_str())
            .and_then(|r| r.strip_prefix('_'))
            .and_then(|r| r.strip_suffix(self.extension.as_str()))
            .and_then(|r| r.strip_suffix('.'))
        else {
            return false;
        };

        if rest.len() < TIMESTAMP_LEN || !rest.is_char_boundary(TIMESTAMP_LEN) {
            return false;
        }
        let (timestamp, counter) = rest.split_at(TIMESTAMP_LEN);
        if NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).is_err() {
            return false;
        }

        match counter.strip_prefix('_') {
            None => counter.is_empty(),
            Some(digits) => digits.len() == 3 && digits.bytes().all(|b| b.is_ascii_digit()),
        }
    }
}

/// Copy `data_file` into `backup_dir` under a fresh timestamped name.
pub fn create_backup(
    data_file: &Path,
    backup_dir: &Path,
    naming: &BackupNaming,
    at: NaiveDateTime,
) -> PersistenceResult<String> {
    fs::create_dir_all(backup_dir)
        .map_err(|e| PersistenceError::io_error_at_path(backup_dir, e))?;

    let name = next_free_name(backup_dir, naming, at)?;
    copy_with_fsync(data_file, &backup_dir.join(&name))?;
    fsync_dir_best_effort(backup_dir);
    Ok(name)
}

// Continues after the highest counter used for this second, even when
// retention already deleted the lower ones.
fn next_free_name(
    backup_dir: &Path,
    naming: &BackupNaming,
    at: NaiveDateTime,
) -> PersistenceResult<String> {
    let plain = naming.name_at(at);
    let highest = list_backups(backup_dir, naming)?
        .iter()
        .filter_map(|name| {
            if *name == plain {
                Some(0)
            } else {
                naming.counter_at(name, at)
            }
        })
        .max();

    match highest {
        None => Ok(plain),
        Some(n) if n >= MAX_SAME_SECOND => Err(PersistenceError::io_error(
            "Too many backups within one second",
            io::Error::new(io::ErrorKind::AlreadyExists, plain),
        )),
        Some(n) => Ok(naming.name_with_counter(at, n + 1)),
    }
}

/// Backup names in `backup_dir`, newest first. A missing directory has no
/// backups.
pub fn list_backups(backup_dir: &Path, naming: &BackupNaming) -> PersistenceResult<Vec<String>> {
    let entries = match fs::read_dir(backup_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PersistenceError::io_error_at_path(backup_dir, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PersistenceError::io_error_at_path(backup_dir, e))?;
        if !entry.path().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if naming.matches(name) {
                names.push(name.to_string());
            }
        }
    }

    names.sort_unstable_by(|a, b| b.cmp(a));
    Ok(names)
}

/// Delete all but the `keep` newest backups, returning the deleted names.
pub fn prune_backups(
    backup_dir: &Path,
    naming: &BackupNaming,
    keep: usize,
) -> PersistenceResult<Vec<String>> {
    let names = list_backups(backup_dir, naming)?;
    let mut removed = Vec::new();

    for name in names.into_iter().skip(keep) {
        let path = backup_dir.join(&name);
        match fs::remove_file(&path) {
            Ok(()) => removed.push(name),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(PersistenceError::io_error_at_path(&path, e)),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn naming() -> BackupNaming {
        BackupNaming::for_file(Path::new("library_data/library_data.json"))
    }

    fn at(hour: u32, min: u32, sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(hour, min, sec)
            .unwrap()
    }

    #[test]
    fn test_name_pattern() {
        assert_eq!(naming().name_at(at(9, 5, 7)), "library_data_20261019_090507.json");
    }

    #[test]
    fn test_matches() {
        let naming = naming();
        assert!(naming.matches("library_data_20261019_090507.json"));
        assert!(naming.matches("library_data_20261019_090507_001.json"));
        assert!(!naming.matches("library_data.json"));
        assert!(!naming.matches("library_data_20261019_090507.json.tmp"));
        assert!(!naming.matches("library_data_2026101x_090507.json"));
        assert!(!naming.matches("other_20261019_090507.json"));
        assert!(!naming.matches("library_data_20261019_090507_1.json"));
    }

    #[test]
    fn test_same_second_backups_keep_creation_order() {
        let dir = TempDir::new().unwrap();
        let live = dir.path().join("library_data.json");
        let backups = dir.path().join("backups");
        let naming = naming();

        let mut created = Vec::new();
        for i in 0..3 {
            fs::write(&live, format!("{{\"n\":{}}}", i)).unwrap();
            created.push(create_backup(&live, &backups, &naming, at(12, 0, 0)).unwrap());
        }
        created.push({
            fs::write(&live, "{}").unwrap();
            create_backup(&live, &backups, &naming, at(12, 0, 1)).unwrap()
        });

        let listed = list_backups(&backups, &naming).unwrap();
        let mut newest_first = created.clone();
        newest_first.reverse();
        assert_eq!(listed, newest_first);
        assert_eq!(created[1], "library_data_20261019_120000_001.json");
    }

    #[test]
    fn test_counter_continues_after_prune() {
        let dir = TempDir::new().unwrap();
        let live = dir.path().join("library_data.json");
        let backups = dir.path().join("backups");
        let naming = naming();
        fs::write(&live, "{}").unwrap();

        for _ in 0..3 {
            create_backup(&live, &backups, &naming, at(12, 0, 0)).unwrap();
        }
        prune_backups(&backups, &naming, 1).unwrap();

        let next = create_backup(&live, &backups, &naming, at(12, 0, 0)).unwrap();
        assert_eq!(next, "library_data_20261019_120000_003.json");
        assert_eq!(list_backups(&backups, &naming).unwrap()[0], next);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let listed = list_backups(&dir.path().join("absent"), &naming()).unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = TempDir::new().unwrap();
        let live = dir.path().join("library_data.json");
        let backups = dir.path().join("backups");
        fs::write(&live, "{}").unwrap();

        for sec in 0..7 {
            create_backup(&live, &backups, &naming(), at(8, 0, sec)).unwrap();
        }
        fs::write(backups.join("notes.txt"), "keep me").unwrap();

        let removed = prune_backups(&backups, &naming(), 5).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(removed.contains(&"library_data_20261019_080000.json".to_string()));

        let left = list_backups(&backups, &naming()).unwrap();
        assert_eq!(left.len(), 5);
        assert_eq!(left[0], "library_data_20261019_080006.json");
        assert!(backups.join("notes.txt").exists());
    }
}
