//! Cache key validation.
//!
//! Keys double as shard file names (`data/{key}.json`), so anything that
//! would let a key escape the data directory, or collide with how shards are
//! discovered, is rejected before touching the disk.

use crate::error::{ErrorKind, Result};

/// Validates a cache key for use as a shard file name.
///
/// # Examples
///
/// ```
/// use resync_cache::validate_key;
/// // Valid keys
/// assert!(validate_key("CSE").is_ok());
/// assert!(validate_key("CSE 142").is_ok());
/// assert!(validate_key("2025-autumn.CSE").is_ok());
/// // Invalid keys
/// assert!(validate_key("").is_err());
/// assert!(validate_key("..").is_err());
/// assert!(validate_key("a/b").is_err());
/// assert!(validate_key("a\0b").is_err());
/// ```
pub fn validate(key: &str) -> Result<&str> {
    if key.is_empty() || key == "." || key == ".." {
        exn::bail!(ErrorKind::InvalidKey(key.to_string()));
    }
    // Null bytes cause truncation in C-based syscalls; backslashes are
    // separators on Windows and a nightmare everywhere else.
    if key.contains(['/', '\\', '\0']) {
        exn::bail!(ErrorKind::InvalidKey(key.to_string()));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("CSE")]
    #[case("CSE 142")]
    #[case("a.json")]
    #[case(".hidden")]
    #[case("日本語")]
    fn test_valid_keys(#[case] key: &str) {
        assert_eq!(validate(key).unwrap(), key);
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("..")]
    #[case("../etc/passwd")]
    #[case("a/b")]
    #[case("a\\b")]
    #[case("a\0b")]
    fn test_invalid_keys(#[case] key: &str) {
        let err = validate(key).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(k) if k == key));
    }
}
