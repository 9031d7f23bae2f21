use super::{ItemReport, Outcome};
use crate::hooks::Hooks;
use resync_cache::error::Result as CacheResult;
use resync_cache::{Cache, Value, validate_key};
use serde::Serialize;
use std::fmt::Display;

/// Run one item through the cache-check, fetch, filter, transform and store
/// steps.
///
/// A failed fetch becomes [`Outcome::Failed`]; only cache errors are returned
/// as `Err`.
pub(super) async fn process_item<T, R, E, F, Fut>(
    item: &T,
    fetch: &F,
    cache: &dyn Cache,
    hooks: &Hooks<T, R>,
) -> CacheResult<ItemReport>
where
    R: Serialize,
    E: Display,
    F: Fn(&T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let key = hooks.cache_key(item);
    let display_name = hooks.display_name(item);
    let outcome = outcome(item, &key, fetch, cache, hooks).await?;
    Ok(ItemReport { key, display_name, outcome })
}

async fn outcome<T, R, E, F, Fut>(
    item: &T,
    key: &str,
    fetch: &F,
    cache: &dyn Cache,
    hooks: &Hooks<T, R>,
) -> CacheResult<Outcome>
where
    R: Serialize,
    E: Display,
    F: Fn(&T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    // A key that can't be stored is this item's problem, not the cache's.
    if let Err(e) = validate_key(key) {
        return Ok(Outcome::Failed(e.to_string()));
    }
    // A stored `null` is an empty result and gets fetched again.
    if cache.get(key).await?.is_some_and(|value| !value.is_null()) {
        return Ok(Outcome::Cached);
    }

    let result = match fetch(item).await {
        Ok(result) => result,
        Err(e) => return Ok(Outcome::Failed(e.to_string())),
    };
    if hooks.should_skip(item, &result) {
        return Ok(Outcome::Filtered);
    }
    let value = match hooks.to_value(result) {
        Ok(value) => value,
        Err(e) => return Ok(Outcome::Failed(format!("result cannot be cached as JSON: {e}"))),
    };

    let items = item_count(&value);
    cache.set(key, value).await?;
    Ok(Outcome::Fetched { items })
}

/// A list result counts each of its elements; anything else counts once.
fn item_count(value: &Value) -> u64 {
    match value {
        Value::Array(values) => u64::try_from(values.len()).unwrap_or(u64::MAX),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resync_cache::MemoryCache;
    use rstest::rstest;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[rstest]
    #[case(json!([1, 2, 3]), 3)]
    #[case(json!([]), 0)]
    #[case(json!({"a": 1, "b": 2}), 1)]
    #[case(json!("text"), 1)]
    #[case(json!(null), 1)]
    fn test_item_count(#[case] value: Value, #[case] expected: u64) {
        assert_eq!(item_count(&value), expected);
    }

    #[tokio::test]
    async fn test_cached_item_is_not_fetched() {
        let cache = MemoryCache::with_entries([("a", json!([1]))]);
        let hooks: Hooks<&str, Vec<u8>> = Hooks::keyed(|s: &&str| s.to_string());
        let calls = AtomicUsize::new(0);
        let fetch = |_: &&str| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(vec![1]) }
        };

        let report = process_item(&"a", &fetch, &cache, &hooks).await.unwrap();
        assert_eq!(report.outcome, Outcome::Cached);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cached_null_is_fetched_again() {
        let cache = MemoryCache::new();
        let hooks: Hooks<&str, Option<u8>> = Hooks::keyed(|s: &&str| s.to_string());
        let calls = AtomicUsize::new(0);
        let fetch = |_: &&str| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(None) }
        };

        let first = process_item(&"a", &fetch, &cache, &hooks).await.unwrap();
        assert_eq!(first.outcome, Outcome::Fetched { items: 1 });
        assert_eq!(cache.get("a").await.unwrap(), Some(Value::Null));

        let second = process_item(&"a", &fetch, &cache, &hooks).await.unwrap();
        assert_eq!(second.outcome, Outcome::Fetched { items: 1 });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetched_item_is_cached() {
        let cache = MemoryCache::new();
        let hooks: Hooks<&str, Vec<u8>> = Hooks::keyed(|s: &&str| s.to_string());
        let fetch = |_: &&str| async { Ok::<_, String>(vec![1, 2]) };

        let report = process_item(&"a", &fetch, &cache, &hooks).await.unwrap();
        assert_eq!(report.outcome, Outcome::Fetched { items: 2 });
        assert_eq!(cache.get("a").await.unwrap(), Some(json!([1, 2])));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_an_outcome() {
        let cache = MemoryCache::new();
        let hooks: Hooks<&str, Vec<u8>> = Hooks::keyed(|s: &&str| s.to_string());
        let fetch = |_: &&str| async { Err::<Vec<u8>, _>("connection reset") };

        let report = process_item(&"a", &fetch, &cache, &hooks).await.unwrap();
        assert_eq!(report.outcome, Outcome::Failed("connection reset".to_string()));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_key_is_an_outcome() {
        let cache = MemoryCache::new();
        let hooks: Hooks<&str, Vec<u8>> = Hooks::keyed(|s: &&str| s.to_string());
        let fetch = |_: &&str| async { Ok::<_, String>(vec![]) };

        let report = process_item(&"../escape", &fetch, &cache, &hooks).await.unwrap();
        assert!(matches!(report.outcome, Outcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_filtered_item_is_not_cached() {
        let cache = MemoryCache::new();
        let hooks: Hooks<&str, Vec<u8>> = Hooks::keyed(|s: &&str| s.to_string()).skip_if(|_, r: &Vec<u8>| r.is_empty());
        let fetch = |_: &&str| async { Ok::<_, String>(vec![]) };

        let report = process_item(&"a", &fetch, &cache, &hooks).await.unwrap();
        assert_eq!(report.outcome, Outcome::Filtered);
        assert_eq!(cache.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transform_is_cached() {
        let cache = MemoryCache::new();
        let hooks: Hooks<&str, Vec<u8>> =
            Hooks::keyed(|s: &&str| s.to_string()).transform(|r| json!({ "sections": r }));
        let fetch = |_: &&str| async { Ok::<_, String>(vec![4, 5]) };

        let report = process_item(&"a", &fetch, &cache, &hooks).await.unwrap();
        assert_eq!(report.outcome, Outcome::Fetched { items: 1 });
        assert_eq!(cache.get("a").await.unwrap(), Some(json!({ "sections": [4, 5] })));
    }
}
