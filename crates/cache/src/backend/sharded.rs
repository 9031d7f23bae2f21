//! Index + sharded-file cache.
//!
//! Layout under the cache root:
//!
//! ```text
//! root/
//! ├── overview.json      {"CSE": {"last_synced": "2025-03-14T15:09:26Z"}, ...}
//! └── data/
//!     ├── CSE.json       raw serialized value for key "CSE"
//!     └── MATH.json
//! ```
//!
//! Splitting the index from the payloads keeps the frequently rewritten index
//! small, while each (potentially large) payload is written once per key.

use crate::backend::{Cache, is_temporary, read_json, write_atomic};
use crate::error::{ErrorKind, Result};
use crate::index::{Index, IndexEntry, Reconciliation};
use crate::key::validate as validate_key;
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use futures::{Stream, TryStreamExt};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs::{self, DirEntry};
use tokio::sync::Mutex;
use tracing::instrument;

const INDEX_FILE: &str = "overview.json";
const DATA_DIR: &str = "data";
const SHARD_EXTENSION: &str = "json";

enum ShardEntry {
    Shard(String),
    Temporary(PathBuf),
    Skip,
}

/// Cache made of an index file plus one data shard per key.
///
/// The data shards are authoritative. The index is a rebuildable summary
/// that [`load()`](Self::load) reconciles against the shards, so a crash
/// between writing a shard and updating the index (or a shard deleted by
/// hand) heals itself on the next run.
///
/// # Examples
///
/// ```no_run
/// use resync_cache::{Cache, ShardedCache, Value};
///
/// # async fn example() -> resync_cache::error::Result<()> {
/// let cache = ShardedCache::open("/var/cache/resync/courses").await?;
/// cache.set("CSE", Value::from(vec!["CSE 142", "CSE 143"])).await?;
/// assert!(cache.get("CSE").await?.is_some());
/// # Ok(())
/// # }
/// ```
pub struct ShardedCache {
    name: String,
    root: PathBuf,
    /// Guards both the in-memory index and the index file on disk; the index
    /// is the only state shared between keys.
    index: Mutex<Index>,
}
impl ShardedCache {
    /// Create a cache rooted at `root`, creating the directories if needed.
    ///
    /// The in-memory index starts empty; call [`load()`](Self::load) (or use
    /// [`open()`](Self::open)) to read and reconcile what is already on disk.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRoot`](ErrorKind::InvalidRoot) if the path is not
    /// absolute or is not a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() || (root.exists() && !root.is_dir()) {
            exn::bail!(ErrorKind::InvalidRoot(root));
        }
        // Non-async on purpose: it happens once per cache and isn't worth
        // making the constructor async.
        let data = root.join(DATA_DIR);
        sync_create_dir(&data).or_raise(|| ErrorKind::Io(data.clone()))?;
        Ok(Self {
            name: root.display().to_string(),
            root,
            index: Mutex::new(Index::new()),
        })
    }

    /// Create the cache and immediately [`load()`](Self::load) it.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let cache = Self::new(root)?;
        cache.load().await?;
        Ok(cache)
    }

    /// Override the name used in log output (defaults to the root path).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    fn shard_path(&self, key: &str) -> Result<PathBuf> {
        let key = validate_key(key)?;
        Ok(self.data_dir().join(format!("{key}.{SHARD_EXTENSION}")))
    }

    /// When `key` was last written, according to the index.
    pub async fn last_synced(&self, key: &str) -> Option<OffsetDateTime> {
        self.index.lock().await.get(key).map(|entry| entry.last_synced)
    }

    /// Number of keys in the index.
    pub async fn len(&self) -> usize {
        self.index.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Read the index from disk and reconcile it with the data shards.
    ///
    /// - A missing index file is an empty index, not an error.
    /// - Index entries without a shard are dropped (stale entries).
    /// - Shards without an index entry are adopted with `last_synced = now`.
    /// - Temporary files left behind by interrupted writes are removed.
    ///
    /// The repaired index replaces the in-memory state and is written back
    /// to disk. Afterwards, [`keys()`](Cache::keys) lists exactly the keys
    /// that have a shard.
    ///
    /// # Errors
    ///
    /// Returns [`Corrupt`](ErrorKind::Corrupt) if the index file exists but
    /// cannot be parsed, and [`Io`](ErrorKind::Io) for filesystem failures.
    #[instrument(level = "debug", skip(self), fields(cache = %self.name))]
    pub async fn load(&self) -> Result<Reconciliation> {
        let mut index = self.index.lock().await;
        let mut loaded: Index = read_json(&self.index_path()).await?.unwrap_or_default();
        let mut report = Reconciliation::default();

        let mut on_disk = BTreeSet::new();
        let mut shards = Box::pin(self.shards());
        while let Some(entry) = shards.try_next().await? {
            match entry {
                ShardEntry::Shard(key) => {
                    on_disk.insert(key);
                },
                ShardEntry::Temporary(path) => {
                    fs::remove_file(&path).await.or_raise(|| ErrorKind::Io(path.clone()))?;
                    report.cleaned += 1;
                },
                ShardEntry::Skip => {},
            }
        }

        loaded.retain(|key, _| {
            let keep = on_disk.contains(key);
            if !keep {
                report.dropped.push(key.clone());
            }
            keep
        });
        let now = IndexEntry::now();
        for key in on_disk {
            if !loaded.contains_key(&key) {
                loaded.insert(key.clone(), now);
                report.adopted.push(key);
            }
        }

        self.persist(&loaded).await?;
        *index = loaded;

        if report.is_clean() {
            tracing::debug!(cache = %self.name, keys = index.len(), "Loaded cache index");
        } else {
            tracing::info!(
                cache = %self.name,
                keys = index.len(),
                dropped = report.dropped.len(),
                adopted = report.adopted.len(),
                cleaned = report.cleaned,
                "Reconciled cache index with data shards"
            );
        }
        Ok(report)
    }

    /// Must be called with the index lock held.
    async fn persist(&self, index: &Index) -> Result<()> {
        let bytes = serde_json::to_vec(index).or_raise(|| ErrorKind::Serialize(INDEX_FILE.to_string()))?;
        write_atomic(&self.index_path(), &bytes).await
    }

    /// Stream every entry in the data directory, classified.
    ///
    /// A data directory that doesn't exist (deleted out-of-band) is treated
    /// as empty.
    fn shards(&self) -> impl Stream<Item = Result<ShardEntry>> + '_ {
        let data = self.data_dir();
        stream! {
            let mut entries = match fs::read_dir(&data).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
                Err(e) => {
                    yield Err::<ShardEntry, _>(e).or_raise(|| ErrorKind::Io(data.clone()));
                    return;
                },
            };
            loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => yield Self::classify(entry).await,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err::<ShardEntry, _>(e).or_raise(|| ErrorKind::Io(data.clone()));
                        break;
                    },
                }
            }
        }
    }

    async fn classify(entry: DirEntry) -> Result<ShardEntry> {
        let path = entry.path();
        let file_type = entry.file_type().await.or_raise(|| ErrorKind::Io(path.clone()))?;
        if !file_type.is_file() {
            return Ok(ShardEntry::Skip);
        }
        if is_temporary(&path) {
            return Ok(ShardEntry::Temporary(path));
        }
        if path.extension().is_none_or(|ext| ext != SHARD_EXTENSION) {
            return Ok(ShardEntry::Skip);
        }
        let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
            tracing::warn!(path = %path.display(), "Ignoring data shard with a non UTF-8 name");
            return Ok(ShardEntry::Skip);
        };
        match validate_key(key) {
            Ok(key) => Ok(ShardEntry::Shard(key.to_string())),
            Err(_) => Ok(ShardEntry::Skip),
        }
    }
}

#[async_trait]
impl Cache for ShardedCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        read_json(&self.shard_path(key)?).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let path = self.shard_path(key)?;
        let bytes = serde_json::to_vec(&value).or_raise(|| ErrorKind::Serialize(key.to_string()))?;
        // The data directory may have been removed since the cache was opened.
        let data = self.data_dir();
        fs::create_dir_all(&data).await.or_raise(|| ErrorKind::Io(data))?;
        write_atomic(&path, &bytes).await?;
        // Shard first, index second: a crash in between leaves an unindexed
        // shard, which load() adopts.
        let mut index = self.index.lock().await;
        index.insert(key.to_string(), IndexEntry::now());
        self.persist(&index).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.shard_path(key)?;
        {
            let mut index = self.index.lock().await;
            index.shift_remove(key);
            self.persist(&index).await?;
        }
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).or_raise(|| ErrorKind::Io(path)),
        }
    }

    async fn keys(&self) -> Vec<String> {
        self.index.lock().await.keys().cloned().collect()
    }
}
