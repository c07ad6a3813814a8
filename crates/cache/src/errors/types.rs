//! Core error types for the cache engine

use std::path::PathBuf;
use std::time::Duration;

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Re-export CacheError as Error for convenience
pub use CacheError as Error;

/// Error type for cache operations
///
/// Only `InvalidKey`, `Io`, `Serialization` and `Configuration` ever reach a
/// caller of [`crate::FileCache`]. `Corruption` is produced by the codec and
/// absorbed by the engine as a logged miss.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Key contains a reserved character
    #[error("\"{key}\" is not a valid cache key: {reason}")]
    InvalidKey {
        key: String,
        reason: String,
        recovery_hint: RecoveryHint,
    },

    /// Filesystem fault other than a missing path
    #[error("I/O error during {operation} on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: std::io::Error,
        recovery_hint: RecoveryHint,
    },

    /// A value could not be encoded for storage
    #[error("failed to encode cache entry '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        recovery_hint: RecoveryHint,
    },

    /// Stored content could not be reconstructed
    #[error("corrupted cache file '{}': {reason}", path.display())]
    Corruption {
        path: PathBuf,
        reason: String,
        recovery_hint: RecoveryHint,
    },

    /// Invalid configuration
    #[error("configuration error: {message}")]
    Configuration {
        message: String,
        recovery_hint: RecoveryHint,
    },
}

/// Recovery hints for error handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryHint {
    /// Retry the operation
    Retry { after: Duration },

    /// Clear the cache and retry
    ClearAndRetry,

    /// Check file permissions
    CheckPermissions { path: PathBuf },

    /// Check disk space and clean up if needed
    CheckDiskSpace,

    /// No automated recovery possible
    Manual { instructions: String },

    /// Operation can be safely ignored
    Ignore,
}
