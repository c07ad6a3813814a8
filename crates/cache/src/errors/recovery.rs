//! Recovery utilities for cache errors

use super::types::{CacheError, RecoveryHint};
use std::io::ErrorKind;

impl CacheError {
    /// Get the recovery hint for this error
    #[must_use]
    pub const fn recovery_hint(&self) -> &RecoveryHint {
        match self {
            Self::InvalidKey { recovery_hint, .. }
            | Self::Io { recovery_hint, .. }
            | Self::Serialization { recovery_hint, .. }
            | Self::Corruption { recovery_hint, .. }
            | Self::Configuration { recovery_hint, .. } => recovery_hint,
        }
    }

    /// Check if this error is transient and can be retried by the caller
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.recovery_hint(), RecoveryHint::Retry { .. })
    }

    /// Check if this error indicates data corruption
    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption { .. })
    }

    /// Check if this error wraps a "path missing" filesystem error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Io { source, .. } => source.kind() == ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Check if this error was caused by an invalid key
    #[must_use]
    pub const fn is_invalid_key(&self) -> bool {
        matches!(self, Self::InvalidKey { .. })
    }
}
