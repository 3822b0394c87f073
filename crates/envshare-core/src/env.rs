//! The environment provider the cache reads from and writes back to.
//!
//! The cache never touches process state directly; it is handed an
//! [`EnvProvider`] at construction. [`ProcessEnv`] binds to the real process
//! environment and [`MemoryEnv`] keeps bindings in a map.

use std::collections::BTreeMap;
use tracing::warn;

/// Whether `name` can be bound in a process environment.
///
/// Empty names and names containing `=` or NUL are rejected by the OS.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['=', '\0'])
}

/// Whether `value` can be bound in a process environment.
pub fn is_valid_value(value: &str) -> bool {
    !value.contains('\0')
}

/// A mutable store of string-named bindings.
pub trait EnvProvider {
    /// Current value of `name`, or `None` if unset.
    fn get(&self, name: &str) -> Option<String>;

    /// Bind `name` to `value`, replacing any previous binding.
    fn set(&mut self, name: &str, value: &str);

    /// Unset `name`. Removing an unset name is a no-op.
    fn remove(&mut self, name: &str);

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn get_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }
}

/// The environment of the current process.
///
/// Values that are not valid Unicode are treated as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvProvider for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn set(&mut self, name: &str, value: &str) {
        if !is_valid_name(name) || !is_valid_value(value) {
            warn!("Refusing to bind invalid environment variable {:?}", name);
            return;
        }
        std::env::set_var(name, value);
    }

    fn remove(&mut self, name: &str) {
        if !is_valid_name(name) {
            warn!("Refusing to unset invalid environment variable {:?}", name);
            return;
        }
        std::env::remove_var(name);
    }
}

/// An in-memory environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryEnv {
    vars: BTreeMap<String, String>,
}

impl MemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvProvider for MemoryEnv {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    fn remove(&mut self, name: &str) {
        self.vars.remove(name);
    }

    fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }
}

impl<T: EnvProvider + ?Sized> EnvProvider for &mut T {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }

    fn set(&mut self, name: &str, value: &str) {
        (**self).set(name, value);
    }

    fn remove(&mut self, name: &str) {
        (**self).remove(name);
    }

    fn contains(&self, name: &str) -> bool {
        (**self).contains(name)
    }
}
