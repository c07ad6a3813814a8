//! Builder for configuring and opening a [`FileCache`]

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::engine::FileCache;
use crate::errors::{CacheError, RecoveryHint, Result};
use crate::expiry::Ttl;
use crate::precompile::{precompile_available, PageCacheWarmer, Precompiler};
use crate::store::FileStore;
use chrono::Duration;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

/// How far before startup written files are back-dated
const MTIME_BACKDATE_SECS: i64 = 10;

/// Builder for [`FileCache`]
#[derive(Default)]
pub struct CacheBuilder {
    config: CacheConfig,
    clock: Option<Arc<dyn Clock>>,
    precompiler: Option<Arc<dyn Precompiler>>,
}

impl CacheBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root directory
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.root = root.into();
        self
    }

    /// Set the TTL used when a write passes none
    pub fn default_ttl(mut self, ttl: impl Into<Ttl>) -> Self {
        self.config.default_ttl = Some(ttl.into());
        self
    }

    /// Force precompile hooks on for this cache
    pub fn precompile(mut self, enabled: bool) -> Self {
        self.config.precompile = enabled;
        self
    }

    /// Use `clock` instead of the system clock
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Use `precompiler` instead of [`PageCacheWarmer`] when hooks are enabled
    pub fn precompiler(mut self, precompiler: Arc<dyn Precompiler>) -> Self {
        self.precompiler = Some(precompiler);
        self
    }

    /// Build the cache
    ///
    /// Does not touch the filesystem; the root is created by the first write.
    pub fn build(self) -> Result<FileCache> {
        if self.config.root.as_os_str().is_empty() {
            return Err(CacheError::Configuration {
                message: "cache root directory is empty".to_string(),
                recovery_hint: RecoveryHint::Manual {
                    instructions: "Configure a cache directory".to_string(),
                },
            });
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let hooks_enabled = self.config.precompile || precompile_available();
        let precompiler = if hooks_enabled {
            Some(
                self.precompiler
                    .unwrap_or_else(|| Arc::new(PageCacheWarmer) as Arc<dyn Precompiler>),
            )
        } else {
            None
        };

        let started_at = clock.now();
        let mtime: SystemTime = (started_at - Duration::seconds(MTIME_BACKDATE_SECS)).into();

        tracing::debug!(
            root = %self.config.root.display(),
            precompile = precompiler.is_some(),
            "opened file cache"
        );

        Ok(FileCache {
            root: self.config.root,
            default_ttl: self.config.default_ttl,
            clock,
            store: FileStore::new(mtime, precompiler),
        })
    }
}

impl From<CacheConfig> for CacheBuilder {
    fn from(config: CacheConfig) -> Self {
        Self {
            config,
            clock: None,
            precompiler: None,
        }
    }
}
