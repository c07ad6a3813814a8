//! The cache engine
//!
//! Every operation reads the clock at most once and reuses that instant for
//! all keys it touches. Batch operations validate and mutate key by key, so
//! an invalid key part-way through a batch leaves the earlier keys mutated.

use crate::builder::CacheBuilder;
use crate::clock::Clock;
use crate::codec::{self, CacheItem, DecodeError};
use crate::config::CacheConfig;
use crate::errors::Result;
use crate::expiry::{expiry_for, is_expired, Expiry, Ttl};
use crate::keys::{path_for, validate_key};
use crate::store::FileStore;
use crate::walker::DirectoryWalker;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Filesystem-backed key-value cache with TTL expiry
///
/// One file per key, safe to share between processes pointing at the same
/// root. Concurrent writers to one key race; the last rename wins.
pub struct FileCache {
    pub(crate) root: PathBuf,
    pub(crate) default_ttl: Option<Ttl>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) store: FileStore,
}

/// Result of looking at one item file
enum Lookup {
    Missing,
    Expired,
    Live(CacheItem),
}

impl FileCache {
    /// Open a cache with `config`, the system clock and no precompiler
    pub fn new(config: CacheConfig) -> Result<Self> {
        CacheBuilder::from(config).build()
    }

    pub fn builder() -> CacheBuilder {
        CacheBuilder::new()
    }

    /// Root directory of this cache
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that stores `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(path_for(&self.root, key))
    }

    /// Fetch the value stored under `key`
    ///
    /// Missing, expired and undecodable items all read as `None`. Reading an
    /// expired item deletes its file.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let now = self.clock.now();
        self.get_at(key, now)
    }

    /// Like [`FileCache::get`] with a fallback value
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Fetch several keys in request order
    ///
    /// Stops at the first invalid key without reading any later key.
    pub fn get_multiple<T, I, K>(&self, keys: I) -> Result<IndexMap<String, Option<T>>>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let now = self.clock.now();
        let mut values = IndexMap::new();

        for key in keys {
            let key = key.as_ref();
            let value = self.get_at(key, now)?;
            values.insert(key.to_string(), value);
        }

        Ok(values)
    }

    /// Like [`FileCache::get_multiple`] with a fallback for every miss
    pub fn get_multiple_or<T, I, K>(&self, keys: I, default: T) -> Result<IndexMap<String, T>>
    where
        T: DeserializeOwned + Clone,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let values = self.get_multiple(keys)?;
        Ok(values
            .into_iter()
            .map(|(key, value)| (key, value.unwrap_or_else(|| default.clone())))
            .collect())
    }

    /// Store `value` under `key`
    ///
    /// A non-positive TTL deletes the key instead and returns `false`.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Ttl>) -> Result<bool> {
        let now = self.clock.now();

        match expiry_for(ttl, self.default_ttl, now) {
            Expiry::Immediate => {
                self.delete_key(key)?;
                Ok(false)
            }
            expiry => {
                self.write_key(key, value, expiry.timestamp())?;
                Ok(true)
            }
        }
    }

    /// Store several values sharing one expiry decision
    ///
    /// A non-positive TTL deletes every key of the batch and returns `false`.
    pub fn set_multiple<I, K, V>(&self, values: I, ttl: Option<Ttl>) -> Result<bool>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        let now = self.clock.now();

        match expiry_for(ttl, self.default_ttl, now) {
            Expiry::Immediate => {
                for (key, _) in values {
                    self.delete_key(key.as_ref())?;
                }
                Ok(false)
            }
            expiry => {
                let expiry = expiry.timestamp();
                for (key, value) in values {
                    self.write_key(key.as_ref(), &value, expiry)?;
                }
                Ok(true)
            }
        }
    }

    /// Remove `key`; succeeds whether or not it existed
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.delete_key(key)?;
        Ok(true)
    }

    /// Remove several keys in turn
    pub fn delete_multiple<I, K>(&self, keys: I) -> Result<bool>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for key in keys {
            self.delete_key(key.as_ref())?;
        }
        Ok(true)
    }

    /// Whether a live item is stored under `key`
    ///
    /// Independent of the stored value's type: a stored `None` or `()` counts
    /// as present. Only the envelope is decoded, so an item whose value does
    /// not decode as the type a caller later asks `get` for still counts as
    /// present here, while that `get` reads it as a logged miss.
    pub fn has(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let now = self.clock.now();
        let path = path_for(&self.root, key);

        Ok(matches!(self.lookup(&path, Some(key), now)?, Lookup::Live(_)))
    }

    /// Remove every item and shard directory, keeping the root
    pub fn clear(&self) -> Result<bool> {
        self.walker().clear()?;
        Ok(true)
    }

    /// Remove expired items and the directories they leave empty
    pub fn prune(&self) -> Result<()> {
        let now = self.clock.now();
        self.walker()
            .prune(|path| Ok(matches!(self.lookup(path, None, now)?, Lookup::Expired)))?;
        Ok(())
    }

    fn walker(&self) -> DirectoryWalker {
        DirectoryWalker::new(&self.root, self.store.clone())
    }

    fn get_at<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Result<Option<T>> {
        validate_key(key)?;
        let path = path_for(&self.root, key);

        let item = match self.lookup(&path, Some(key), now)? {
            Lookup::Live(item) => item,
            Lookup::Missing | Lookup::Expired => {
                tracing::debug!(key, "cache miss");
                return Ok(None);
            }
        };

        match item.value() {
            Ok(value) => {
                tracing::debug!(key, "cache hit");
                Ok(Some(value))
            }
            Err(e) => {
                warn_undecodable(&path, e);
                Ok(None)
            }
        }
    }

    /// Read and check the item at `path`, deleting it when expired
    ///
    /// With `key`, the stored key must match it.
    fn lookup(&self, path: &Path, key: Option<&str>, now: DateTime<Utc>) -> Result<Lookup> {
        let bytes = match self.store.read(path)? {
            Some(bytes) => bytes,
            None => return Ok(Lookup::Missing),
        };

        let item = match codec::decode(&bytes) {
            Ok(item) => item,
            Err(e) if e.is_truncated() => {
                tracing::debug!(path = %path.display(), "ignoring truncated cache file");
                return Ok(Lookup::Missing);
            }
            Err(e) => {
                warn_undecodable(path, e);
                return Ok(Lookup::Missing);
            }
        };

        if let Some(requested) = key {
            if item.key != requested {
                let e = DecodeError::KeyMismatch {
                    stored: item.key,
                    requested: requested.to_string(),
                };
                warn_undecodable(path, e);
                return Ok(Lookup::Missing);
            }
        }

        if is_expired(item.expiry, now) {
            self.store.delete(path)?;
            tracing::debug!(path = %path.display(), "removed expired cache file");
            return Ok(Lookup::Expired);
        }

        Ok(Lookup::Live(item))
    }

    fn write_key<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<()> {
        validate_key(key)?;
        let path = path_for(&self.root, key);
        let bytes = codec::encode(key, value, expiry)?;
        self.store.write(&path, &bytes)
    }

    fn delete_key(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.store.delete(&path_for(&self.root, key))?;
        Ok(())
    }
}

/// Undecodable files read as misses and are left in place for `clear`
fn warn_undecodable(path: &Path, error: DecodeError) {
    let error = error.into_cache_error(path);
    tracing::warn!(
        file = %path.display(),
        error = %error,
        hint = ?error.recovery_hint(),
        "Failed to decode cache file"
    );
}

impl fmt::Debug for FileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCache")
            .field("root", &self.root)
            .field("default_ttl", &self.default_ttl)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
