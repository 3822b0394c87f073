//! Error types for envshare.
//!
//! Public cache operations never return these to the caller; they are
//! produced by the file primitives and logged where the cache resolves them.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the envshare library.
#[derive(Debug, Error)]
pub enum EnvShareError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Locking errors
    #[error("Timed out after {waited:?} waiting for lock {path}")]
    LockTimeout { path: PathBuf, waited: Duration },
}

/// Result type alias for envshare operations.
pub type Result<T> = std::result::Result<T, EnvShareError>;

impl From<std::io::Error> for EnvShareError {
    fn from(err: std::io::Error) -> Self {
        EnvShareError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for EnvShareError {
    fn from(err: serde_json::Error) -> Self {
        EnvShareError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl EnvShareError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        EnvShareError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether the next poll/publish cycle may succeed without intervention.
    ///
    /// A busy lock clears once the holder finishes. Corrupt documents stay
    /// corrupt until some process overwrites them.
    pub fn is_transient(&self) -> bool {
        matches!(self, EnvShareError::LockTimeout { .. })
    }
}
