//! Single-document cache.
//!
//! Every entry lives in one JSON object (`{key: value, ...}`). Simple and
//! easy to inspect, but each write rewrites everything; prefer
//! [`ShardedCache`](super::ShardedCache) for large or numerous values.

use crate::backend::{Cache, read_json, write_atomic};
use crate::error::{ErrorKind, Result};
use crate::key::validate as validate_key;
use async_trait::async_trait;
use exn::ResultExt;
use indexmap::IndexMap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type Document = IndexMap<String, Value>;

/// Cache backed by a single JSON file.
pub struct FileCache {
    name: String,
    path: PathBuf,
    entries: Mutex<Document>,
}
impl FileCache {
    /// Create a cache stored at `path` (a file, not a directory). Parent
    /// directories are created if needed; the file itself is only written by
    /// the first [`set()`](Cache::set) or [`delete()`](Cache::delete).
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_absolute() || path.is_dir() {
            exn::bail!(ErrorKind::InvalidRoot(path));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
        }
        Ok(Self {
            name: path.display().to_string(),
            path,
            entries: Mutex::new(Document::new()),
        })
    }

    /// Create the cache and immediately [`load()`](Self::load) it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let cache = Self::new(path)?;
        cache.load().await?;
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory entries with the contents of the file. A missing
    /// file is an empty cache. Returns the number of entries loaded.
    pub async fn load(&self) -> Result<usize> {
        let mut entries = self.entries.lock().await;
        *entries = read_json(&self.path).await?.unwrap_or_default();
        tracing::debug!(cache = %self.name, keys = entries.len(), "Loaded cache file");
        Ok(entries.len())
    }

    async fn persist(&self, entries: &Document) -> Result<()> {
        let bytes = serde_json::to_vec(entries).or_raise(|| ErrorKind::Serialize(self.name.clone()))?;
        write_atomic(&self.path, &bytes).await
    }
}

#[async_trait]
impl Cache for FileCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let key = validate_key(key)?;
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let key = validate_key(key)?;
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.persist(&entries).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        let mut entries = self.entries.lock().await;
        if entries.shift_remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }

    async fn keys(&self) -> Vec<String> {
        self.entries.lock().await.keys().cloned().collect()
    }
}
