//! Key validation and key-to-path mapping
//!
//! A key maps to `root/h[0]/h[1]/h[2..]` where `h` is the lowercase hex
//! XXH3-128 digest of the raw key bytes. The two single-character directory
//! levels spread files over 256 shards.

use crate::errors::{CacheError, RecoveryHint, Result};
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_128;

/// Characters a cache key must not contain
pub const RESERVED_CHARACTERS: &str = "{}()/\\@:";

/// Reject keys containing any of [`RESERVED_CHARACTERS`]
///
/// The empty string is a valid key.
pub fn validate_key(key: &str) -> Result<()> {
    if let Some(c) = key.chars().find(|c| RESERVED_CHARACTERS.contains(*c)) {
        return Err(CacheError::InvalidKey {
            key: key.to_string(),
            reason: format!(
                "contains reserved character '{c}' (reserved: {RESERVED_CHARACTERS})"
            ),
            recovery_hint: RecoveryHint::Manual {
                instructions: format!("Remove the characters {RESERVED_CHARACTERS} from the key"),
            },
        });
    }
    Ok(())
}

/// Hash a key into a 32 character lowercase hex digest
#[inline]
pub fn hash_key(key: &str) -> String {
    format!("{:032x}", xxh3_128(key.as_bytes()))
}

/// Sharded file path for `key` under `root`
///
/// Pure function of the key; does not validate it.
pub fn path_for(root: &Path, key: &str) -> PathBuf {
    let hash = hash_key(key);
    root.join(&hash[..1]).join(&hash[1..2]).join(&hash[2..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("{")]
    #[case("}")]
    #[case("(")]
    #[case(")")]
    #[case("/")]
    #[case("\\")]
    #[case("@")]
    #[case(":")]
    #[case("user:42")]
    #[case("a/b")]
    fn test_reserved_characters_are_rejected(#[case] key: &str) {
        let err = validate_key(key).unwrap_err();
        assert!(err.is_invalid_key());
        assert!(err.to_string().contains(key));
    }

    #[rstest]
    #[case("")]
    #[case("key")]
    #[case("user.42_profile-v2")]
    #[case("ключ")]
    fn test_ordinary_keys_are_accepted(#[case] key: &str) {
        assert!(validate_key(key).is_ok());
    }

    #[test]
    fn test_known_key_maps_to_known_path() {
        let path = path_for(Path::new("/cache"), "key");
        assert_eq!(
            path,
            PathBuf::from("/cache/a/4/bdf4e564564cf8bbea0d63a05165e3")
        );
    }

    #[test]
    fn test_empty_key_has_a_path() {
        let path = path_for(Path::new("/cache"), "");
        let relative = path.strip_prefix("/cache").unwrap();
        assert_eq!(relative.components().count(), 3);
    }

    proptest! {
        #[test]
        fn prop_hash_is_fixed_width_lower_hex(key in ".*") {
            let hash = hash_key(&key);
            prop_assert_eq!(hash.len(), 32);
            prop_assert!(hash.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        }

        #[test]
        fn prop_path_is_deterministic(key in ".*") {
            let root = Path::new("/root");
            prop_assert_eq!(path_for(root, &key), path_for(root, &key));
        }

        #[test]
        fn prop_distinct_keys_get_distinct_paths(a in "[a-z0-9]{1,16}", b in "[a-z0-9]{1,16}") {
            prop_assume!(a != b);
            let root = Path::new("/root");
            prop_assert_ne!(path_for(root, &a), path_for(root, &b));
        }
    }
}
