//! Sync Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Only failures that make continuing unsafe are errors. A fetch that fails
//! is an [`Outcome::Failed`](crate::Outcome::Failed), reported through the
//! event stream and counted in the statistics; it never surfaces here.

use derive_more::{Display, Error};

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Reading from or writing to the cache failed. Resumability depends on
    /// the cache being consistent, so the run stops after the current batch.
    #[display("cache failure")]
    Cache,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            // The cache error in the tree knows better; a rerun resumes from
            // the cache either way.
            Self::Cache => true,
        }
    }
}
