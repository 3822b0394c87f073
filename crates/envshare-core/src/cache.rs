//! The shared value cache.
//!
//! Each process holds a [`SharedValueCache`] with its own copy of the shared
//! names. `publish` writes the whole mapping to the backing file under the
//! lock; `poll` compares the file's mtime against the last sync and reloads
//! when another process has written since. A publish overwrites the whole
//! document, so names tracked only by other processes are dropped from the
//! file (last writer wins).
//!
//! No operation here returns an error. Failures are logged, counted in
//! [`SyncStats`] and flip the cache to [`CacheStatus::Degraded`] until the
//! next successful sync.

use crate::config::SharedCacheConfig;
use crate::env::{is_valid_name, is_valid_value, EnvProvider};
use crate::store::{read_document, write_document, LockGuard, SharedEntries};
use crate::{EnvShareError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Whether the last file operation went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// The backing file was read or written successfully.
    Ok,
    /// The backing file is missing or unusable; values live only in memory.
    Degraded,
}

/// What a call to [`SharedValueCache::poll`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The backing file has not changed since the last sync.
    Unchanged,
    /// The backing file was newer and has been loaded.
    Reloaded,
    /// There is no backing file yet.
    Missing,
    /// The file could not be inspected, locked or parsed this cycle.
    Failed,
}

/// Counters for successful and failed sync attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub reloads: u64,
    pub publishes: u64,
    pub failures: u64,
}

/// A set of environment variables shared with other processes through a
/// lock-protected file.
#[derive(Debug)]
pub struct SharedValueCache<E: EnvProvider> {
    entries: SharedEntries,
    backing_path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
    lock_retry_interval: Duration,
    last_sync: SystemTime,
    status: CacheStatus,
    stats: SyncStats,
    env: E,
}

impl<E: EnvProvider> SharedValueCache<E> {
    /// Create a cache and load whatever other processes have shared so far.
    ///
    /// A missing or unreadable backing file leaves the cache empty and
    /// degraded; construction itself never fails.
    pub fn new(config: SharedCacheConfig, env: E) -> Self {
        let mut cache = Self {
            entries: SharedEntries::new(),
            lock_path: config.lock_file(),
            backing_path: config.cache_file,
            lock_timeout: config.lock_timeout,
            lock_retry_interval: config.lock_retry_interval,
            last_sync: UNIX_EPOCH,
            status: CacheStatus::Degraded,
            stats: SyncStats::default(),
            env,
        };
        cache.reload();
        cache
    }

    /// Start sharing `names` and publish the result.
    ///
    /// Names that are already tracked are left alone here; `publish` refreshes
    /// every tracked name from the environment anyway. Returns whether the
    /// publish reached the backing file.
    pub fn track_and_publish<I, S>(&mut self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            if !is_valid_name(name) {
                warn!("Ignoring invalid variable name {:?}", name);
                continue;
            }
            if !self.entries.contains_key(name) {
                debug!("Tracking {}", name);
                self.entries.insert(name.to_string(), self.env.get(name));
            }
        }
        self.publish()
    }

    /// Refresh every tracked name from the environment and overwrite the
    /// backing file with the full mapping.
    ///
    /// Returns whether the file was written.
    pub fn publish(&mut self) -> bool {
        for (name, value) in self.entries.iter_mut() {
            *value = self.env.get(name);
        }

        match self.write_locked() {
            Ok(synced_at) => {
                self.mark_synced(synced_at);
                self.stats.publishes += 1;
                debug!(
                    "Published {} shared values to {}",
                    self.entries.len(),
                    self.backing_path.display()
                );
                true
            }
            Err(e) => {
                self.mark_failed(&e, "publish");
                false
            }
        }
    }

    /// Load the backing file and apply it to the environment.
    ///
    /// Names mapped to the absent-sentinel are unset; all others are bound to
    /// the loaded value. The tracked set becomes exactly the loaded mapping.
    /// On any failure the entries and the environment are left untouched.
    /// Returns whether a document was loaded.
    pub fn reload(&mut self) -> bool {
        match self.read_locked() {
            Ok(Some((loaded, synced_at))) => {
                self.apply(loaded);
                self.mark_synced(synced_at);
                self.stats.reloads += 1;
                true
            }
            Ok(None) => {
                debug!(
                    "No shared values at {} yet",
                    self.backing_path.display()
                );
                self.status = CacheStatus::Degraded;
                false
            }
            Err(e) => {
                self.mark_failed(&e, "reload");
                false
            }
        }
    }

    /// Reload if the backing file changed after the last sync.
    ///
    /// Intended to run once per prompt or command. The file counts as
    /// changed when its mtime is strictly later than the last sync time.
    pub fn poll(&mut self) -> PollOutcome {
        let modified = match fs::metadata(&self.backing_path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.status = CacheStatus::Degraded;
                return PollOutcome::Missing;
            }
            Err(e) => {
                debug!("Could not stat {}: {}", self.backing_path.display(), e);
                return PollOutcome::Failed;
            }
        };

        if modified <= self.last_sync {
            return PollOutcome::Unchanged;
        }

        if self.reload() {
            PollOutcome::Reloaded
        } else if self.backing_path.exists() {
            PollOutcome::Failed
        } else {
            PollOutcome::Missing
        }
    }

    pub fn entries(&self) -> &SharedEntries {
        &self.entries
    }

    /// The cached value for `name`. The outer `Option` is `None` when the
    /// name is not tracked; the inner one is the absent-sentinel.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries.get(name).map(|v| v.as_deref())
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn tracked_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn last_sync(&self) -> SystemTime {
        self.last_sync
    }

    pub fn status(&self) -> CacheStatus {
        self.status
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn backing_path(&self) -> &Path {
        &self.backing_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn lock(&self) -> Result<LockGuard> {
        LockGuard::acquire(&self.lock_path, self.lock_timeout, self.lock_retry_interval)
    }

    /// Write the document and return its mtime, observed before the lock
    /// is released.
    fn write_locked(&self) -> Result<SystemTime> {
        let _guard = self.lock()?;
        write_document(&self.backing_path, &self.entries)?;
        Ok(self.observed_mtime())
    }

    /// Read the document together with the mtime it had while locked.
    fn read_locked(&self) -> Result<Option<(SharedEntries, SystemTime)>> {
        let _guard = self.lock()?;
        let loaded = read_document(&self.backing_path)?;
        Ok(loaded.map(|entries| (entries, self.observed_mtime())))
    }

    // Sync time is the file's own mtime so any later write compares newer,
    // whatever the clock granularity of the filesystem.
    fn observed_mtime(&self) -> SystemTime {
        fs::metadata(&self.backing_path)
            .and_then(|m| m.modified())
            .unwrap_or_else(|_| SystemTime::now())
    }

    fn apply(&mut self, loaded: SharedEntries) {
        let mut accepted = SharedEntries::new();
        for (name, value) in loaded {
            if !is_valid_name(&name) {
                warn!("Skipping invalid shared variable name {:?}", name);
                continue;
            }
            match &value {
                None => {
                    if self.env.contains(&name) {
                        self.env.remove(&name);
                    }
                }
                Some(v) if is_valid_value(v) => self.env.set(&name, v),
                Some(_) => {
                    warn!("Skipping shared variable {} with a NUL in its value", name);
                    continue;
                }
            }
            accepted.insert(name, value);
        }
        info!(
            "Loaded {} shared values from {}",
            accepted.len(),
            self.backing_path.display()
        );
        self.entries = accepted;
    }

    fn mark_synced(&mut self, at: SystemTime) {
        self.last_sync = at;
        self.status = CacheStatus::Ok;
    }

    fn mark_failed(&mut self, err: &EnvShareError, operation: &str) {
        self.stats.failures += 1;
        self.status = CacheStatus::Degraded;
        if err.is_transient() {
            warn!("Skipping shared value {} this cycle: {}", operation, err);
        } else {
            warn!(
                "Failed to {} shared values at {}: {}",
                operation,
                self.backing_path.display(),
                err
            );
        }
    }
}
