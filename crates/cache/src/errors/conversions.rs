//! Translation of native filesystem errors into [`CacheError`]

use super::types::{CacheError, RecoveryHint};
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

/// Wrap an I/O error raised by `operation` on `path`
///
/// The recovery hint is picked from the error kind. Callers match
/// `ErrorKind::NotFound` themselves before reaching here whenever a missing
/// path means "absent" rather than "failed".
pub fn io_error(path: impl AsRef<Path>, operation: &'static str, source: std::io::Error) -> CacheError {
    let path = path.as_ref().to_path_buf();
    let recovery_hint = hint_for(source.kind(), &path);

    CacheError::Io {
        path,
        operation,
        source,
        recovery_hint,
    }
}

fn hint_for(kind: ErrorKind, path: &Path) -> RecoveryHint {
    match kind {
        ErrorKind::PermissionDenied => RecoveryHint::CheckPermissions {
            path: path.to_path_buf(),
        },
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => {
            RecoveryHint::Retry {
                after: Duration::from_millis(100),
            }
        }
        ErrorKind::StorageFull | ErrorKind::QuotaExceeded | ErrorKind::FileTooLarge => {
            RecoveryHint::CheckDiskSpace
        }
        _ => RecoveryHint::Manual {
            instructions: format!("Inspect cache path {}", path.display()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_permission_denied_points_at_path() {
        let err = io_error(
            "/tmp/cache/a/4/x",
            "write temporary file",
            io::Error::from(ErrorKind::PermissionDenied),
        );

        match err {
            CacheError::Io {
                operation,
                recovery_hint,
                ..
            } => {
                assert_eq!(operation, "write temporary file");
                assert_eq!(
                    recovery_hint,
                    RecoveryHint::CheckPermissions {
                        path: PathBuf::from("/tmp/cache/a/4/x")
                    }
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_display_mentions_operation_and_path() {
        let err = io_error("/root/x", "remove cache file", io::Error::other("boom"));
        let message = err.to_string();
        assert!(message.contains("remove cache file"));
        assert!(message.contains("/root/x"));
        assert!(message.contains("boom"));
    }
}
