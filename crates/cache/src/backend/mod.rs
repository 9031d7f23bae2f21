//! Cache trait and implementations.
//!
//! This module defines the [`Cache`] trait, which provides a unified
//! interface over the different ways a sync's results can be persisted
//! (sharded files on disk, a single JSON document, memory).

mod file;
mod memory;
mod sharded;

pub use self::file::FileCache;
pub use self::memory::MemoryCache;
pub use self::sharded::ShardedCache;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

pub(crate) const TEMPORARY_EXTENSION: &str = "tmp";

/// Unified interface for sync caches.
///
/// A present key means "this item is done": the orchestrator skips items
/// whose key is cached. Absence is therefore meaningful, and [`get()`](Self::get)
/// must never create an entry.
///
/// # Concurrency
/// Every unit in a sync batch shares one cache, so implementations must be
/// safe to call concurrently through `&self`. Writes to distinct keys never
/// collide; anything shared between keys (such as an index) must be guarded
/// internally.
///
/// # Examples
///
/// ```
/// use resync_cache::{Cache, MemoryCache, Value};
/// use resync_cache::error::Result;
///
/// async fn remember(cache: &dyn Cache, key: &str) -> Result<bool> {
///     if cache.get(key).await?.is_some() {
///         return Ok(false);
///     }
///     cache.set(key, Value::Bool(true)).await?;
///     Ok(true)
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<()> {
/// let cache = MemoryCache::new();
/// assert!(remember(&cache, "CSE").await?);
/// assert!(!remember(&cache, "CSE").await?);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Cache: Send + Sync {
    /// Name of the cache, used for logging only.
    fn name(&self) -> &str;

    /// Fetch the value stored for `key`, or `None` if the key is not cached.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value. Once this
    /// returns `Ok`, the entry survives a process restart (for persistent
    /// implementations).
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove `key`. Removing a key that is not cached is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// All cached keys, in the order they were first written.
    ///
    /// This reflects already-loaded state and does not re-read the disk.
    async fn keys(&self) -> Vec<String>;
}

/// Read and parse a JSON file, treating a missing file as `None`.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).or_raise(|| ErrorKind::Io(path.to_path_buf())),
    };
    serde_json::from_slice(&bytes).map(Some).or_raise(|| ErrorKind::Corrupt(path.to_path_buf()))
}

/// Write `data` to a sibling temporary file, then rename it over `path`.
///
/// Readers (and a process restarted after a crash) see either the previous
/// contents or the new contents, never a partial write. Temporary names are
/// unique per call so concurrent writers of the same path don't trample each
/// other's temporary file.
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let temporary = temporary_path(path);
    if let Err(e) = fs::write(&temporary, data).await {
        // Best effort; a leftover is cleaned up on the next load anyway.
        _ = fs::remove_file(&temporary).await;
        return Err(e).or_raise(|| ErrorKind::Io(temporary));
    }
    fs::rename(&temporary, path).await.or_raise(|| ErrorKind::Io(path.to_path_buf()))
}

fn temporary_path(path: &Path) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}-{n}.{TEMPORARY_EXTENSION}", std::process::id()));
    PathBuf::from(name)
}

pub(crate) fn is_temporary(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == TEMPORARY_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_paths_are_unique_siblings() {
        let target = Path::new("/cache/data/CSE.json");
        let a = temporary_path(target);
        let b = temporary_path(target);
        assert_ne!(a, b);
        assert_eq!(a.parent(), target.parent());
        assert!(is_temporary(&a));
        assert!(!is_temporary(target));
    }

    #[tokio::test]
    async fn test_read_json_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing: Option<Value> = read_json(&temp_dir.path().join("nope.json")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_read_json_corrupt_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, b"{not json").unwrap();
        let err = read_json::<Value>(&path).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Corrupt(p) if p == &path));
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_contents() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("value.json");
        write_atomic(&path, b"[1]").await.unwrap();
        write_atomic(&path, b"[1,2]").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"[1,2]");
        // No temporary files left behind.
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }
}
