//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Underlying I/O and serde errors are
//! kept as children of the raised [`ErrorKind`].

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Key cannot be used as a shard file name.
    #[display("invalid cache key: {_0:?}")]
    InvalidKey(#[error(not(source))] String),
    /// Cache root is relative, or exists but is not a directory.
    #[display("invalid cache root: {}", _0.display())]
    InvalidRoot(#[error(not(source))] PathBuf),
    /// Reading or writing a cache file failed.
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// A cache file exists but could not be parsed. Retrying won't help;
    /// the file needs to be repaired or removed.
    #[display("corrupt cache file: {}", _0.display())]
    Corrupt(#[error(not(source))] PathBuf),
    /// A value (or the index itself) could not be serialized to JSON.
    #[display("could not serialize {_0:?} to JSON")]
    Serialize(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::InvalidKey("a/b".to_string()).to_string(), r#"invalid cache key: "a/b""#);
        assert_eq!(ErrorKind::Corrupt(PathBuf::from("/tmp/x.json")).to_string(), "corrupt cache file: /tmp/x.json");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Io(PathBuf::from("/tmp")).is_retryable());
        assert!(!ErrorKind::Corrupt(PathBuf::from("/tmp")).is_retryable());
        assert!(!ErrorKind::InvalidKey(String::new()).is_retryable());
    }

    #[test]
    fn io_error_is_kept_as_child() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"));
        let err: Result<()> = result.or_raise(|| ErrorKind::Io(PathBuf::from("/cache/overview.json")));
        let exn = err.unwrap_err();
        assert!(matches!(&*exn, ErrorKind::Io(_)));
    }
}
