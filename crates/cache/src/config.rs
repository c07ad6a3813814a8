//! Cache configuration

use crate::errors::{CacheError, RecoveryHint, Result};
use crate::expiry::Ttl;
use crate::precompile::{parse_flag, PRECOMPILE_ENV};
use std::env;
use std::path::PathBuf;

/// Environment variable overriding the cache root
pub const DIR_ENV: &str = "WARMSTASH_DIR";

/// Environment variable holding the default TTL in seconds
pub const DEFAULT_TTL_ENV: &str = "WARMSTASH_DEFAULT_TTL";

/// Configuration for a [`crate::FileCache`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Root directory holding the shard directories
    pub root: PathBuf,
    /// TTL applied to writes that do not pass one
    pub default_ttl: Option<Ttl>,
    /// Run precompile hooks even if the process-wide switch is off
    pub precompile: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            default_ttl: None,
            precompile: false,
        }
    }
}

impl CacheConfig {
    /// Configuration rooted at `root` with no default TTL
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Defaults overlaid with `WARMSTASH_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = env::var(DIR_ENV) {
            if !dir.is_empty() {
                config.root = PathBuf::from(dir);
            }
        }

        if let Ok(raw) = env::var(DEFAULT_TTL_ENV) {
            let seconds = match raw.trim().parse::<i64>() {
                Ok(seconds) => seconds,
                Err(e) => {
                    return Err(CacheError::Configuration {
                        message: format!("{DEFAULT_TTL_ENV}={raw:?} is not a number of seconds: {e}"),
                        recovery_hint: RecoveryHint::Manual {
                            instructions: format!("Set {DEFAULT_TTL_ENV} to an integer"),
                        },
                    });
                }
            };
            config.default_ttl = Some(Ttl::Seconds(seconds));
        }

        if let Ok(raw) = env::var(PRECOMPILE_ENV) {
            config.precompile = match parse_flag(&raw) {
                Some(flag) => flag,
                None => {
                    return Err(CacheError::Configuration {
                        message: format!("{PRECOMPILE_ENV}={raw:?} is not a boolean"),
                        recovery_hint: RecoveryHint::Manual {
                            instructions: format!("Set {PRECOMPILE_ENV} to 1 or 0"),
                        },
                    });
                }
            };
        }

        Ok(config)
    }
}

/// `XDG_CACHE_HOME/warmstash`, falling back to the platform cache directory
fn default_root() -> PathBuf {
    env::var("XDG_CACHE_HOME")
        .ok()
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::cache_dir)
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("warmstash")
}
