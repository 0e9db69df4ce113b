// Whole-file persistence helpers shared by the on-disk artifacts
// Every write goes to a sibling temp file first and is renamed into place,
// so a crash never leaves a half-written artifact behind.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{AssistError, Result};

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `bytes` (temp file + rename)
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| AssistError::storage(parent, e))?;
        }
    }

    let tmp = temp_path(path);
    fs::write(&tmp, bytes).map_err(|e| AssistError::storage(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AssistError::storage(path, e)
    })
}

/// Serialize `value` as pretty JSON and write it atomically
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
}

/// Read a JSON artifact. Missing or unparsable files yield `None`; the
/// latter is logged because it means the artifact was damaged.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring corrupted {}: {}", path.display(), e);
            None
        }
    }
}

/// Delete a file; a file that is already gone is not an error
pub fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AssistError::storage(path, e)),
    }
}
