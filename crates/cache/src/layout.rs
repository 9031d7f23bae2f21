use crate::error::Result;
use crate::{CacheHandle, FileCache, MemoryCache, ShardedCache};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Which [`Cache`](crate::Cache) implementation to use, selectable from
/// configuration.
#[derive(Debug, Display, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheLayout {
    /// [`ShardedCache`]: `path` is a directory.
    #[default]
    #[display("sharded")]
    Sharded,
    /// [`FileCache`]: `path` is a JSON file.
    #[display("file")]
    File,
    /// [`MemoryCache`]: `path` is ignored.
    #[display("memory")]
    Memory,
}
impl CacheLayout {
    /// Construct and load the cache for this layout.
    pub async fn open(self, path: impl AsRef<Path>) -> Result<CacheHandle> {
        let cache: CacheHandle = match self {
            Self::Sharded => Arc::new(ShardedCache::open(path).await?),
            Self::File => Arc::new(FileCache::open(path).await?),
            Self::Memory => Arc::new(MemoryCache::new()),
        };
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cache;
    use rstest::rstest;

    #[rstest]
    #[case(r#""sharded""#, CacheLayout::Sharded)]
    #[case(r#""file""#, CacheLayout::File)]
    #[case(r#""memory""#, CacheLayout::Memory)]
    fn test_deserialize(#[case] input: &str, #[case] expected: CacheLayout) {
        assert_eq!(serde_json::from_str::<CacheLayout>(input).unwrap(), expected);
        assert_eq!(serde_json::to_string(&expected).unwrap(), input);
    }

    #[tokio::test]
    async fn test_open_sharded() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = CacheLayout::Sharded.open(temp_dir.path()).await.unwrap();
        cache.set("CSE", serde_json::json!(1)).await.unwrap();
        assert!(temp_dir.path().join("data/CSE.json").exists());
    }

    #[tokio::test]
    async fn test_open_memory_ignores_path() {
        let cache = CacheLayout::Memory.open("relative/is/fine").await.unwrap();
        assert_eq!(cache.name(), "memory");
    }
}
