//! On-disk item format
//!
//! ```text
//! +--------+---------+-------+-------------+-------------+----------------+
//! | magic  | version | flags | payload_len | payload_crc | payload        |
//! | 4B     | 2B      | 2B    | 8B          | 4B (CRC32C) | bincode(item)  |
//! +--------+---------+-------+-------------+-------------+----------------+
//! ```
//!
//! The payload is a [`CacheItem`] whose `value` holds the bincode encoding of
//! the caller's value. The envelope can therefore be checked (key, expiry)
//! without knowing the value's type.

use crate::errors::{CacheError, RecoveryHint};
use chrono::{DateTime, Utc};
use crc32c::crc32c;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;

/// Magic number for item files: "WSTH"
pub const ITEM_MAGIC: u32 = 0x5753_5448;

/// Current item format version
pub const FORMAT_VERSION: u16 = 1;

/// Encoded size of [`ItemHeader`]
pub const HEADER_LEN: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ItemHeader {
    magic: u32,
    version: u16,
    /// Reserved, always zero
    flags: u16,
    payload_len: u64,
    payload_crc: u32,
}

/// A stored item: the original key, the encoded value and its expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheItem {
    pub key: String,
    pub value: Vec<u8>,
    pub expiry: Option<DateTime<Utc>>,
}

impl CacheItem {
    /// Reconstruct the stored value
    pub fn value<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        bincode::deserialize(&self.value).map_err(DecodeError::Value)
    }
}

/// Why a file could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Empty or cut-off file; treated as "no item"
    #[error("file is truncated")]
    Truncated,

    #[error("invalid magic number: expected {ITEM_MAGIC:08x}, got {0:08x}")]
    BadMagic(u32),

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),

    #[error("{0} unexpected bytes after the payload")]
    TrailingBytes(u64),

    #[error("payload CRC mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("malformed item envelope: {0}")]
    Envelope(#[source] bincode::Error),

    #[error("stored value cannot be decoded: {0}")]
    Value(#[source] bincode::Error),

    #[error("stored key '{stored}' does not match requested key '{requested}'")]
    KeyMismatch { stored: String, requested: String },
}

impl DecodeError {
    /// Whether this should be reported or silently treated as absence
    pub fn is_truncated(&self) -> bool {
        matches!(self, DecodeError::Truncated)
    }

    /// Convert into the crate error for `path`
    pub fn into_cache_error(self, path: &Path) -> CacheError {
        CacheError::Corruption {
            path: path.to_path_buf(),
            reason: self.to_string(),
            recovery_hint: RecoveryHint::ClearAndRetry,
        }
    }
}

/// Encode `value` stored under `key` with an optional expiry
pub fn encode<T: Serialize + ?Sized>(
    key: &str,
    value: &T,
    expiry: Option<DateTime<Utc>>,
) -> Result<Vec<u8>, CacheError> {
    let value = match bincode::serialize(value) {
        Ok(bytes) => bytes,
        Err(e) => {
            return Err(CacheError::Serialization {
                key: key.to_string(),
                source: e,
                recovery_hint: RecoveryHint::Manual {
                    instructions: "Check that the value is serializable".to_string(),
                },
            })
        }
    };

    let item = CacheItem {
        key: key.to_string(),
        value,
        expiry,
    };
    let payload = match bincode::serialize(&item) {
        Ok(bytes) => bytes,
        Err(e) => {
            return Err(CacheError::Serialization {
                key: key.to_string(),
                source: e,
                recovery_hint: RecoveryHint::Ignore,
            })
        }
    };

    let header = ItemHeader {
        magic: ITEM_MAGIC,
        version: FORMAT_VERSION,
        flags: 0,
        payload_len: payload.len() as u64,
        payload_crc: crc32c(&payload),
    };

    let mut bytes = match bincode::serialize(&header) {
        Ok(bytes) => bytes,
        Err(e) => {
            return Err(CacheError::Serialization {
                key: key.to_string(),
                source: e,
                recovery_hint: RecoveryHint::Ignore,
            })
        }
    };
    debug_assert_eq!(bytes.len(), HEADER_LEN);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode a whole file's content into its envelope
pub fn decode(bytes: &[u8]) -> Result<CacheItem, DecodeError> {
    if bytes.len() < HEADER_LEN {
        return Err(DecodeError::Truncated);
    }

    let header: ItemHeader = match bincode::deserialize(&bytes[..HEADER_LEN]) {
        Ok(header) => header,
        Err(e) => return Err(DecodeError::Envelope(e)),
    };

    if header.magic != ITEM_MAGIC {
        return Err(DecodeError::BadMagic(header.magic));
    }
    if header.version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion(header.version));
    }

    let payload = &bytes[HEADER_LEN..];
    let actual_len = payload.len() as u64;
    if actual_len < header.payload_len {
        return Err(DecodeError::Truncated);
    }
    if actual_len > header.payload_len {
        return Err(DecodeError::TrailingBytes(actual_len - header.payload_len));
    }

    let actual = crc32c(payload);
    if actual != header.payload_crc {
        return Err(DecodeError::ChecksumMismatch {
            expected: header.payload_crc,
            actual,
        });
    }

    bincode::deserialize(payload).map_err(DecodeError::Envelope)
}
