//! Integration tests for the shared cache public interface.
//!
//! Each `SharedValueCache` instance stands in for a separate shell process;
//! they only share the backing file in a temp directory.

use envshare_core::{
    read_document, CacheStatus, EnvProvider, MemoryEnv, PollOutcome, SharedCacheConfig,
    SharedValueCache,
};
use std::fs;
use std::thread;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Create an isolated directory for one test's backing file.
fn create_test_env() -> (TempDir, SharedCacheConfig) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = SharedCacheConfig::in_dir(temp_dir.path())
        .with_lock_timeout(Duration::from_secs(5))
        .with_lock_retry_interval(Duration::from_millis(2));
    (temp_dir, config)
}

fn process(config: &SharedCacheConfig, vars: &[(&str, &str)]) -> SharedValueCache<MemoryEnv> {
    SharedValueCache::new(config.clone(), vars.iter().copied().collect())
}

fn touch_future(cache: &SharedValueCache<MemoryEnv>) {
    filetime::set_file_mtime(
        cache.backing_path(),
        filetime::FileTime::from_system_time(SystemTime::now() + Duration::from_secs(10)),
    )
    .unwrap();
}

#[test]
fn test_late_process_sees_existing_values_on_start() {
    let (_dir, config) = create_test_env();
    let mut first = process(&config, &[("KUBECONFIG", "/tmp/kube"), ("DEBUG", "")]);
    assert!(first.track_and_publish(["KUBECONFIG", "DEBUG"]));

    let late = process(&config, &[]);
    assert_eq!(late.status(), CacheStatus::Ok);
    assert_eq!(late.env().get("KUBECONFIG").as_deref(), Some("/tmp/kube"));
    assert_eq!(late.env().get("DEBUG").as_deref(), Some(""));
    assert_eq!(late.stats().reloads, 1);
}

#[test]
fn test_share_then_change_propagates_through_poll() {
    let (_dir, config) = create_test_env();
    let mut a = process(&config, &[("AWS_PROFILE", "dev")]);
    let mut b = process(&config, &[("AWS_PROFILE", "dev")]);

    a.track_and_publish(["AWS_PROFILE"]);
    touch_future(&a);
    assert_eq!(b.poll(), PollOutcome::Reloaded);

    b.env_mut().set("AWS_PROFILE", "prod");
    assert!(b.publish());
    touch_future(&b);

    assert_eq!(a.poll(), PollOutcome::Reloaded);
    assert_eq!(a.env().get("AWS_PROFILE").as_deref(), Some("prod"));
}

#[test]
fn test_unset_propagates_as_removal() {
    let (_dir, config) = create_test_env();
    let mut a = process(&config, &[("AWS_SESSION_TOKEN", "secret")]);
    let mut b = process(&config, &[]);

    a.track_and_publish(["AWS_SESSION_TOKEN"]);
    touch_future(&a);
    b.poll();
    assert!(b.env().contains("AWS_SESSION_TOKEN"));

    a.env_mut().remove("AWS_SESSION_TOKEN");
    a.publish();
    filetime::set_file_mtime(
        a.backing_path(),
        filetime::FileTime::from_system_time(SystemTime::now() + Duration::from_secs(20)),
    )
    .unwrap();

    assert_eq!(b.poll(), PollOutcome::Reloaded);
    assert!(!b.env().contains("AWS_SESSION_TOKEN"));
    assert_eq!(b.get("AWS_SESSION_TOKEN"), Some(None));
}

#[test]
fn test_deleted_file_degrades_then_heals() {
    let (_dir, config) = create_test_env();
    let mut cache = process(&config, &[("X", "1")]);
    cache.track_and_publish(["X"]);

    fs::remove_file(cache.backing_path()).unwrap();
    assert_eq!(cache.poll(), PollOutcome::Missing);
    assert_eq!(cache.status(), CacheStatus::Degraded);
    assert_eq!(cache.get("X"), Some(Some("1")));

    assert!(cache.publish());
    assert_eq!(cache.status(), CacheStatus::Ok);
    assert!(cache.backing_path().exists());
}

#[test]
fn test_corrupt_file_heals_on_next_publish() {
    let (_dir, config) = create_test_env();
    fs::write(&config.cache_file, b"garbage").unwrap();

    let mut cache = process(&config, &[("Y", "2")]);
    assert_eq!(cache.status(), CacheStatus::Degraded);
    assert!(cache.entries().is_empty());
    assert_eq!(cache.stats().failures, 1);

    cache.track_and_publish(["Y"]);
    let on_disk = read_document(cache.backing_path()).unwrap().unwrap();
    assert_eq!(on_disk.get("Y"), Some(&Some("2".to_string())));
}

#[test]
fn test_concurrent_publishers_never_corrupt_the_file() {
    let (_dir, config) = create_test_env();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let config = config.clone();
            thread::spawn(move || {
                let name = format!("VAR_{i}");
                let value = format!("value-{i}");
                let env: MemoryEnv = [(name.clone(), value)].into_iter().collect();
                let mut cache = SharedValueCache::new(config, env);
                for _ in 0..10 {
                    assert!(cache.track_and_publish([name.as_str()]));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let document = read_document(&config.cache_file).unwrap().unwrap();
    assert!(!document.is_empty());
    for (name, value) in &document {
        let suffix = name.trim_start_matches("VAR_");
        assert_eq!(value.as_deref(), Some(format!("value-{suffix}").as_str()));
    }
}
