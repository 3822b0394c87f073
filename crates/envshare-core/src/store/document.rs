//! The shared document: a JSON object of name to value-or-null.
//!
//! Writes go through a sibling temp file that is flushed, synced and renamed
//! over the target, so a reader that ignores the lock never sees a torn file.

use crate::config::{suffixed, PathsConfig};
use crate::{EnvShareError, Result};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process;
use std::thread;
use tracing::debug;

/// Name to value mapping as stored on disk. `None` is the absent-sentinel
/// and serializes as JSON `null`, distinct from `""`.
pub type SharedEntries = BTreeMap<String, Option<String>>;

/// Read and parse the shared document.
///
/// Returns `None` if the file doesn't exist, or an error if it can't be read
/// or parsed.
pub fn read_document(path: &Path) -> Result<Option<SharedEntries>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(EnvShareError::Io {
                message: format!("Failed to open {}", path.display()),
                path: Some(path.to_path_buf()),
                source: Some(e),
            })
        }
    };

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| EnvShareError::Io {
            message: format!("Failed to read {}", path.display()),
            path: Some(path.to_path_buf()),
            source: Some(e),
        })?;

    let entries: SharedEntries =
        serde_json::from_str(&contents).map_err(|e| EnvShareError::Json {
            message: format!("Failed to parse {}: {}", path.display(), e),
            source: Some(e),
        })?;

    Ok(Some(entries))
}

/// Overwrite the shared document with `entries`.
///
/// This function:
/// 1. Serializes the mapping with sorted keys
/// 2. Writes it to a temp file with PID+TID suffix
/// 3. Syncs the temp file
/// 4. Renames it over the target
pub fn write_document(path: &Path, entries: &SharedEntries) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| EnvShareError::Io {
                message: format!("Failed to create directory {}", parent.display()),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }
    }

    let temp_path = suffixed(
        path,
        &format!(".{}.{}{}", process::id(), thread_id(), PathsConfig::TEMP_SUFFIX),
    );

    let serialized = serde_json::to_string_pretty(entries).map_err(|e| EnvShareError::Json {
        message: format!("Failed to serialize shared values: {}", e),
        source: Some(e),
    })?;

    let written = write_synced(&temp_path, serialized.as_bytes());
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(EnvShareError::Io {
            message: format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            ),
            path: Some(path.to_path_buf()),
            source: Some(e),
        });
    }

    debug!("Wrote {} shared values to {}", entries.len(), path.display());
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| EnvShareError::Io {
            message: format!("Failed to create temp file {}", path.display()),
            path: Some(path.to_path_buf()),
            source: Some(e),
        })?;

    file.write_all(bytes).map_err(|e| EnvShareError::Io {
        message: format!("Failed to write temp file {}", path.display()),
        path: Some(path.to_path_buf()),
        source: Some(e),
    })?;

    file.sync_all().map_err(|e| EnvShareError::Io {
        message: format!("Failed to sync temp file {}", path.display()),
        path: Some(path.to_path_buf()),
        source: Some(e),
    })
}

/// Get a unique thread identifier.
fn thread_id() -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    thread::current().id().hash(&mut hasher);
    hasher.finish()
}
