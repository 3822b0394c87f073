//! Host trigger points.
//!
//! A host (shell, REPL, prompt renderer) owns a [`HookRegistry`] and fires
//! events at the matching moments. [`register_cache_hooks`] wires a cache to
//! those events: it polls before each prompt and command, and publishes when
//! the host reports a variable change.

use crate::cache::SharedValueCache;
use crate::env::EnvProvider;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Moments at which a host invokes its subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// Before the prompt is rendered.
    PrePrompt,
    /// Before a command line is executed.
    PreCommand,
    /// After the host changed one of its environment variables.
    EnvVarChange,
}

/// Callback type for hook subscribers.
pub type HookCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// Subscribers keyed by event, invoked in subscription order.
#[derive(Default)]
pub struct HookRegistry {
    subscribers: HashMap<HookEvent, Vec<HookCallback>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, event: HookEvent, callback: HookCallback) {
        self.subscribers.entry(event).or_default().push(callback);
    }

    /// Invoke every subscriber of `event`. Returns how many ran.
    pub fn fire(&self, event: HookEvent) -> usize {
        let Some(callbacks) = self.subscribers.get(&event) else {
            return 0;
        };
        debug!("Firing {:?} for {} subscribers", event, callbacks.len());
        for callback in callbacks {
            callback();
        }
        callbacks.len()
    }

    pub fn subscriber_count(&self, event: HookEvent) -> usize {
        self.subscribers.get(&event).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<_> = self
            .subscribers
            .iter()
            .map(|(event, callbacks)| (*event, callbacks.len()))
            .collect();
        counts.sort_by_key(|(event, _)| format!("{event:?}"));
        f.debug_struct("HookRegistry")
            .field("subscribers", &counts)
            .finish()
    }
}

/// Subscribe `cache` to the host's events.
///
/// `PrePrompt` and `PreCommand` run [`SharedValueCache::poll`];
/// `EnvVarChange` runs [`SharedValueCache::publish`].
pub fn register_cache_hooks<E>(cache: Arc<Mutex<SharedValueCache<E>>>, registry: &mut HookRegistry)
where
    E: EnvProvider + Send + 'static,
{
    for event in [HookEvent::PrePrompt, HookEvent::PreCommand] {
        let cache = Arc::clone(&cache);
        registry.subscribe(
            event,
            Box::new(move || match cache.lock() {
                Ok(mut cache) => {
                    cache.poll();
                }
                Err(_) => warn!("Shared cache mutex poisoned; skipping poll"),
            }),
        );
    }

    registry.subscribe(
        HookEvent::EnvVarChange,
        Box::new(move || match cache.lock() {
            Ok(mut cache) => {
                cache.publish();
            }
            Err(_) => warn!("Shared cache mutex poisoned; skipping publish"),
        }),
    );
}
