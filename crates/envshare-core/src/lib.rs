//! envshare core - environment variables shared between shell processes.
//!
//! Each process keeps a [`SharedValueCache`] of the variable names it shares.
//! Publishing writes the whole set to a JSON file in the temp directory under
//! an advisory lock; polling reloads the file when another process has written
//! it since the last sync and applies the values to the local environment.
//!
//! # Example
//!
//! ```rust,no_run
//! use envshare_core::{HookEvent, HookRegistry, register_cache_hooks, shared_cache};
//!
//! let cache = shared_cache();
//! cache.lock().unwrap().track_and_publish(["AWS_PROFILE"]);
//!
//! let mut hooks = HookRegistry::new();
//! register_cache_hooks(cache, &mut hooks);
//!
//! // In the host loop, before each prompt:
//! hooks.fire(HookEvent::PrePrompt);
//! ```

pub mod cache;
pub mod config;
pub mod env;
pub mod error;
pub mod global;
pub mod hooks;
pub mod store;

// Re-export commonly used types
pub use cache::{CacheStatus, PollOutcome, SharedValueCache, SyncStats};
pub use config::SharedCacheConfig;
pub use env::{EnvProvider, MemoryEnv, ProcessEnv};
pub use error::{EnvShareError, Result};
pub use global::{shared_cache, SharedCacheHandle};
pub use hooks::{register_cache_hooks, HookCallback, HookEvent, HookRegistry};
pub use store::{read_document, write_document, SharedEntries};
