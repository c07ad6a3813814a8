//! Filesystem-backed key-value cache with TTL expiry
//!
//! This crate stores one file per key under a sharded directory tree:
//! - Deterministic key-to-path mapping (XXH3-128, two shard levels)
//! - Atomic writes through temp-file-then-rename
//! - TTL expiry evaluated on read, plus directory-wide `clear` and `prune`
//! - Optional precompile hooks after every write and delete
//!
//! Many processes may share one cache root. There are no locks; concurrent
//! writers to a key resolve as last-writer-wins.
//!
//! ```no_run
//! use warmstash_cache::{FileCache, Ttl};
//!
//! # fn main() -> warmstash_cache::Result<()> {
//! let cache = FileCache::builder().root("/tmp/warmstash").build()?;
//! cache.set("greeting", "hello", Some(Ttl::Seconds(60)))?;
//! let greeting: Option<String> = cache.get("greeting")?;
//! assert_eq!(greeting.as_deref(), Some("hello"));
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod clock;
pub mod codec;
pub mod config;
pub mod engine;
pub mod errors;
pub mod expiry;
pub mod keys;
pub mod precompile;
pub mod store;
pub mod walker;

pub use builder::CacheBuilder;
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{CacheItem, DecodeError};
pub use config::CacheConfig;
pub use engine::FileCache;
pub use errors::{CacheError, Error, RecoveryHint, Result};
pub use expiry::{Expiry, Ttl};
pub use keys::{path_for, validate_key, RESERVED_CHARACTERS};
pub use precompile::{precompile_available, PageCacheWarmer, Precompiler};
pub use walker::WalkReport;
