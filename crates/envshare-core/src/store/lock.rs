//! Scoped advisory lock around the shared document.

use crate::{EnvShareError, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// An exclusive lock on the lock file, released when dropped.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    /// Take the exclusive lock on `path`, creating the file if needed.
    ///
    /// Retries every `retry_interval` until `timeout` has passed, then gives
    /// up with [`EnvShareError::LockTimeout`]. A zero timeout makes exactly
    /// one attempt.
    pub fn acquire(path: &Path, timeout: Duration, retry_interval: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| EnvShareError::io_with_path(e, parent))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| EnvShareError::io_with_path(e, path))?;

        let started = Instant::now();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    debug!("Acquired lock {}", path.display());
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if is_contended(&e) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(EnvShareError::LockTimeout {
                            path: path.to_path_buf(),
                            waited,
                        });
                    }
                    thread::sleep(retry_interval.min(timeout - waited));
                }
                Err(e) => return Err(EnvShareError::io_with_path(e, path)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Closing the handle releases the lock as well; unlocking first keeps
        // the release independent of when the descriptor is closed.
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to unlock {}: {}", self.path.display(), e);
        } else {
            debug!("Released lock {}", self.path.display());
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || (err.raw_os_error().is_some()
            && err.raw_os_error() == fs2::lock_contended_error().raw_os_error())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SHORT: Duration = Duration::from_millis(50);
    const TICK: Duration = Duration::from_millis(5);

    #[test]
    fn test_acquire_creates_lock_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("locks").join("cachefile.lock");

        let guard = LockGuard::acquire(&path, SHORT, TICK).unwrap();
        assert!(path.exists());
        assert_eq!(guard.path(), path.as_path());
    }

    #[test]
    fn test_second_holder_times_out() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cachefile.lock");

        let _held = LockGuard::acquire(&path, SHORT, TICK).unwrap();
        let err = LockGuard::acquire(&path, SHORT, TICK).unwrap_err();
        match err {
            EnvShareError::LockTimeout { path: locked, waited } => {
                assert_eq!(locked, path);
                assert!(waited >= SHORT);
            }
            other => panic!("expected lock timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_drop_releases_lock() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cachefile.lock");

        {
            let _held = LockGuard::acquire(&path, SHORT, TICK).unwrap();
        }
        assert!(LockGuard::acquire(&path, Duration::ZERO, TICK).is_ok());
    }

    #[test]
    fn test_waiter_gets_lock_after_release() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cachefile.lock");

        let held = LockGuard::acquire(&path, SHORT, TICK).unwrap();
        let waiter_path = path.clone();
        let waiter = thread::spawn(move || {
            LockGuard::acquire(&waiter_path, Duration::from_secs(5), TICK).map(|_| ())
        });

        thread::sleep(Duration::from_millis(30));
        drop(held);
        assert!(waiter.join().unwrap().is_ok());
    }
}
