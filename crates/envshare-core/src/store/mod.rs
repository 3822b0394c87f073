//! File primitives behind the shared cache.
//!
//! This module provides:
//! - The JSON document codec with atomic overwrite
//! - A scoped advisory lock with bounded wait

mod document;
mod lock;

pub use document::{read_document, write_document, SharedEntries};
pub use lock::LockGuard;
