//! Atomic file persistence for cache items

use crate::errors::{io_error, CacheError, RecoveryHint, Result};
use crate::precompile::Precompiler;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

/// Prefix and suffix of in-flight temporary files
pub(crate) const TEMP_PREFIX: &str = ".";
pub(crate) const TEMP_SUFFIX: &str = ".tmp";

/// Writes, reads and deletes item files
///
/// Writes go to a temporary file in the destination directory which is then
/// renamed over the final path, so readers see either the old or the new
/// content. Keeps no state besides its configuration.
#[derive(Clone)]
pub struct FileStore {
    /// Modification time stamped on every written file
    mtime: SystemTime,
    /// Present only when precompile hooks are active
    precompiler: Option<Arc<dyn Precompiler>>,
}

impl FileStore {
    pub fn new(mtime: SystemTime, precompiler: Option<Arc<dyn Precompiler>>) -> Self {
        Self { mtime, precompiler }
    }

    /// Atomically replace `path` with `bytes`
    pub fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let parent = match path.parent() {
            Some(p) => p,
            None => {
                return Err(CacheError::Configuration {
                    message: format!("cache path {} has no parent directory", path.display()),
                    recovery_hint: RecoveryHint::Manual {
                        instructions: "Check cache configuration".to_string(),
                    },
                });
            }
        };

        match fs::create_dir_all(parent) {
            Ok(()) => {}
            Err(e) => return Err(io_error(parent, "create cache directory", e)),
        }

        let temp_path = parent.join(format!("{TEMP_PREFIX}{}{TEMP_SUFFIX}", Uuid::new_v4()));

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
        {
            Ok(f) => f,
            Err(e) => return Err(io_error(&temp_path, "create temporary file", e)),
        };

        let written = file
            .write_all(bytes)
            .map_err(|e| io_error(&temp_path, "write temporary file", e))
            .and_then(|()| {
                // Back-dated so freshness checks consider the file settled
                file.set_modified(self.mtime)
                    .map_err(|e| io_error(&temp_path, "set temporary file mtime", e))
            })
            .and_then(|()| {
                file.sync_all()
                    .map_err(|e| io_error(&temp_path, "sync temporary file", e))
            });
        drop(file);

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        match fs::rename(&temp_path, path) {
            Ok(()) => {}
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                return Err(io_error(path, "rename temporary file", e));
            }
        }

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote cache file");

        if let Some(precompiler) = &self.precompiler {
            if let Err(e) = precompiler.invalidate(path) {
                tracing::debug!(path = %path.display(), error = %e, "precompiler invalidate failed");
            }
            if let Err(e) = precompiler.compile(path) {
                tracing::debug!(path = %path.display(), error = %e, "precompiler compile failed");
            }
        }

        Ok(())
    }

    /// Read the whole file; `None` when it does not exist
    pub fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path, "read cache file", e)),
        }
    }

    /// Remove `path`; a file that is already gone counts as removed
    ///
    /// Returns whether this call removed a file.
    pub fn delete(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(io_error(path, "remove cache file", e)),
        }

        tracing::debug!(path = %path.display(), "removed cache file");

        if let Some(precompiler) = &self.precompiler {
            if let Err(e) = precompiler.invalidate(path) {
                tracing::debug!(path = %path.display(), error = %e, "precompiler invalidate failed");
            }
        }

        Ok(true)
    }
}

impl fmt::Debug for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStore")
            .field("mtime", &self.mtime)
            .field("precompile", &self.precompiler.is_some())
            .finish()
    }
}

/// Whether a directory entry name belongs to an in-flight write
pub(crate) fn is_temp_file(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}
