//! Durable file primitives
//!
//! Atomic replacement follows:
//! 1. Write to `<file>.tmp`
//! 2. fsync the temp file
//! 3. Rename temp over the target (atomic on POSIX)
//! 4. fsync the parent directory so the rename itself survives a crash
//!
//! A crash at any step leaves either the old file or the new file, never a
//! torn mix.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::errors::{PersistenceError, PersistenceResult};

/// Temp path used while replacing `path`
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("snapshot"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `contents` atomically.
pub fn write_atomic(path: &Path, contents: &[u8]) -> PersistenceResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PersistenceError::io_error_at_path(parent, e))?;
    }

    let temp_path = temp_path_for(path);
    let result = write_and_rename(&temp_path, path, contents);
    if result.is_err() {
        // Best effort: we are already on an error path.
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_and_rename(temp_path: &Path, path: &Path, contents: &[u8]) -> PersistenceResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| PersistenceError::io_error_at_path(temp_path, e))?;

    file.write_all(contents)
        .map_err(|e| PersistenceError::io_error_at_path(temp_path, e))?;

    file.sync_all().map_err(|e| {
        PersistenceError::io_error(format!("fsync failed for: {}", temp_path.display()), e)
    })?;
    drop(file);

    fs::rename(temp_path, path).map_err(|e| {
        PersistenceError::io_error(
            format!(
                "Failed to replace {} with {}",
                path.display(),
                temp_path.display()
            ),
            e,
        )
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fsync_dir_best_effort(parent);
    }

    Ok(())
}

/// fsync a directory. Not every platform allows opening directories, so
/// failures are ignored.
pub fn fsync_dir_best_effort(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

/// Copy a file byte-for-byte and fsync the copy.
pub fn copy_with_fsync(src: &Path, dst: &Path) -> PersistenceResult<()> {
    fs::copy(src, dst).map_err(|e| {
        PersistenceError::io_error(
            format!("Failed to copy {} to {}", src.display(), dst.display()),
            e,
        )
    })?;

    let copy = File::open(dst).map_err(|e| PersistenceError::io_error_at_path(dst, e))?;
    copy.sync_all()
        .map_err(|e| PersistenceError::io_error(format!("fsync failed for: {}", dst.display()), e))
}
