//! In-memory cache, for tests and dry runs.

use crate::backend::Cache;
use crate::error::Result;
use crate::key::validate as validate_key;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::RwLock;

/// In-memory cache.
///
/// Entries are stored in a map behind a [`RwLock`], so all trait methods can
/// operate on `&self` without external synchronisation. Nothing is
/// persisted: a dropped `MemoryCache` forgets everything.
///
/// # Examples
///
/// ```
/// use resync_cache::{Cache, MemoryCache, Value};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = MemoryCache::with_entries([("CSE", Value::from(3))]);
/// assert_eq!(cache.get("CSE").await?, Some(Value::from(3)));
/// assert_eq!(cache.keys().await, vec!["CSE"]);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<IndexMap<String, Value>>,
}
impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache pre-populated with entries.
    ///
    /// Panics if any key is invalid. If test setup is wrong, then the test
    /// should not pass.
    pub fn with_entries(entries: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Self {
        let mut map = IndexMap::new();
        for (key, value) in entries {
            let key = key.into();
            if validate_key(&key).is_err() {
                panic!("MemoryCache::with_entries: invalid key {key:?}");
            }
            map.insert(key, value);
        }
        Self { entries: RwLock::new(map) }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let key = validate_key(key)?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let key = validate_key(key)?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        self.entries.write().await.shift_remove(key);
        Ok(())
    }

    async fn keys(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }
}
