//! The process-wide cache bound to the real environment.

use crate::cache::SharedValueCache;
use crate::config::SharedCacheConfig;
use crate::env::ProcessEnv;
use std::sync::{Arc, Mutex, OnceLock};

/// Handle to the process cache, shared with hook callbacks.
pub type SharedCacheHandle = Arc<Mutex<SharedValueCache<ProcessEnv>>>;

static SHARED_CACHE: OnceLock<SharedCacheHandle> = OnceLock::new();

/// The cache for this process, created on first use from
/// [`SharedCacheConfig::from_env`]. Creation loads the backing file.
pub fn shared_cache() -> SharedCacheHandle {
    get_or_create(&SHARED_CACHE, SharedCacheConfig::from_env)
}

fn get_or_create<F>(cell: &OnceLock<SharedCacheHandle>, config: F) -> SharedCacheHandle
where
    F: FnOnce() -> SharedCacheConfig,
{
    Arc::clone(cell.get_or_init(|| {
        Arc::new(Mutex::new(SharedValueCache::new(config(), ProcessEnv)))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cell_builds_one_cache() {
        let dir = TempDir::new().unwrap();
        let cell = OnceLock::new();

        let first = get_or_create(&cell, || SharedCacheConfig::in_dir(dir.path()));
        let second = get_or_create(&cell, || panic!("config requested twice"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            first.lock().unwrap().backing_path(),
            dir.path().join("cachefile")
        );
    }
}
