//! Atomic artifact writes.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use dwh_model::Table;

use crate::render::render_csv;
use crate::error::{OutputError, Result};

/// Writes `table` to `path` as CSV, atomically.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    let bytes = render_csv(table, path)?;
    write_atomic(path, &bytes)?;
    tracing::info!(path = %path.display(), rows = table.height(), "wrote artifact");
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("artifact"), ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `bytes` to a temp file next to `path`, syncs it and renames it
/// over `path`. On failure the target is left untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| OutputError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let temp_path = temp_path_for(path);
    let result = write_temp(&temp_path, bytes).and_then(|()| {
        fs::rename(&temp_path, path).map_err(|e| OutputError::AtomicWriteFailed {
            temp_path: temp_path.clone(),
            target_path: path.to_path_buf(),
            source: e,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_temp(temp_path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(temp_path).map_err(|e| OutputError::Io {
        operation: "create",
        path: temp_path.to_path_buf(),
        source: e,
    })?;
    file.write_all(bytes).map_err(|e| OutputError::Io {
        operation: "write",
        path: temp_path.to_path_buf(),
        source: e,
    })?;
    file.sync_all().map_err(|e| OutputError::Io {
        operation: "sync",
        path: temp_path.to_path_buf(),
        source: e,
    })
}
