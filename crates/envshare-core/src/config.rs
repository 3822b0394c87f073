//! Centralized configuration for envshare.
//!
//! Constants for file naming and lock timing, plus the per-cache
//! [`SharedCacheConfig`] that fixes where the backing and lock files live.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File naming used for the shared document.
pub struct PathsConfig;

impl PathsConfig {
    pub const CACHE_FILE_NAME: &'static str = "cachefile";
    pub const LOCK_SUFFIX: &'static str = ".lock";
    pub const TEMP_SUFFIX: &'static str = ".tmp";
    /// Environment variable that overrides the backing file location.
    pub const CACHE_FILE_ENV: &'static str = "ENVSHARE_CACHE_FILE";
}

/// Advisory lock timing.
pub struct LockConfig;

impl LockConfig {
    pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);
    pub const RETRY_INTERVAL: Duration = Duration::from_millis(10);
}

/// Where a cache keeps its state and how long it waits for the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedCacheConfig {
    /// The shared JSON document.
    pub cache_file: PathBuf,
    /// Upper bound on waiting for the lock before skipping a cycle.
    pub lock_timeout: Duration,
    /// Sleep between lock attempts.
    pub lock_retry_interval: Duration,
}

impl SharedCacheConfig {
    /// Config for an explicit backing file path.
    pub fn new(cache_file: impl Into<PathBuf>) -> Self {
        Self {
            cache_file: cache_file.into(),
            lock_timeout: LockConfig::ACQUIRE_TIMEOUT,
            lock_retry_interval: LockConfig::RETRY_INTERVAL,
        }
    }

    /// Config for the default file name inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(PathsConfig::CACHE_FILE_NAME))
    }

    /// Config from the process environment.
    ///
    /// Uses `ENVSHARE_CACHE_FILE` when set and non-empty, otherwise
    /// `cachefile` in the process temp directory (`TMPDIR`).
    pub fn from_env() -> Self {
        match std::env::var_os(PathsConfig::CACHE_FILE_ENV) {
            Some(path) if !path.is_empty() => Self::new(path),
            _ => Self::in_dir(std::env::temp_dir()),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_lock_retry_interval(mut self, interval: Duration) -> Self {
        self.lock_retry_interval = interval;
        self
    }

    /// The companion lock file: the backing path with `.lock` appended.
    pub fn lock_file(&self) -> PathBuf {
        suffixed(&self.cache_file, PathsConfig::LOCK_SUFFIX)
    }
}

impl Default for SharedCacheConfig {
    fn default() -> Self {
        Self::in_dir(std::env::temp_dir())
    }
}

/// Append `suffix` to the final path component without touching extensions.
pub(crate) fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
