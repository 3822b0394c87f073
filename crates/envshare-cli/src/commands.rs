//! Subcommand implementations.
//!
//! Output goes to the writer passed in so tests can capture it.

use crate::shell;
use anyhow::{bail, Result};
use envshare_core::{
    CacheStatus, EnvProvider, MemoryEnv, ProcessEnv, SharedCacheConfig, SharedValueCache,
};
use std::io::Write;
use tracing::{info, warn};

/// Track `names` from this process's environment and publish them.
///
/// The cache loads the existing document first, so values other sessions
/// shared stay in the file alongside the new names.
///
/// Loading the document binds its values into this process, so the caller's
/// own values for `names` are captured first and put back before publishing.
pub fn share(config: SharedCacheConfig, names: &[String], out: &mut impl Write) -> Result<()> {
    let live: Vec<(&str, Option<String>)> = names
        .iter()
        .map(|name| (name.as_str(), ProcessEnv.get(name)))
        .collect();

    let mut cache = SharedValueCache::new(config, ProcessEnv);
    for (name, value) in &live {
        match value {
            Some(value) => cache.env_mut().set(name, value),
            None => cache.env_mut().remove(name),
        }
    }

    if !cache.track_and_publish(names) {
        bail!(
            "could not publish shared values to {}",
            cache.backing_path().display()
        );
    }
    info!("Shared {} variables", names.len());
    for name in names {
        match cache.get(name) {
            Some(Some(_)) => writeln!(out, "shared {name}")?,
            Some(None) => writeln!(out, "shared {name} (unset)")?,
            None => {}
        }
    }
    Ok(())
}

/// Print the shared document, either as `NAME=value` lines or raw JSON.
pub fn show(config: SharedCacheConfig, json: bool, out: &mut impl Write) -> Result<()> {
    let cache = SharedValueCache::new(config, MemoryEnv::new());

    if json {
        serde_json::to_writer_pretty(&mut *out, cache.entries())?;
        writeln!(out)?;
        return Ok(());
    }

    if cache.status() == CacheStatus::Degraded && cache.entries().is_empty() {
        writeln!(out, "no shared values in {}", cache.backing_path().display())?;
        return Ok(());
    }

    for (name, value) in cache.entries() {
        match value {
            Some(value) => writeln!(out, "{name}={value}")?,
            None => writeln!(out, "{name} (unset)")?,
        }
    }
    Ok(())
}

/// Print `export`/`unset` statements for every shared value.
pub fn export(config: SharedCacheConfig, out: &mut impl Write) -> Result<()> {
    let cache = SharedValueCache::new(config, MemoryEnv::new());
    for (name, value) in cache.entries() {
        match shell::statement(name, value.as_deref()) {
            Some(statement) => writeln!(out, "{statement}")?,
            None => warn!("Not exporting {:?}: not a shell variable name", name),
        }
    }
    Ok(())
}
