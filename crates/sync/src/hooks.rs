use serde::Serialize;
use serde_json::Value;

type Extractor<T> = Box<dyn Fn(&T) -> String + Send + Sync>;
type Predicate<T, R> = Box<dyn Fn(&T, &R) -> bool + Send + Sync>;
type Transform<R> = Box<dyn Fn(R) -> Value + Send + Sync>;

/// How the orchestrator sees items of type `T` and fetch results of type `R`.
///
/// - `cache_key` (required): the key an item's result is cached under. Two
///   items with the same key are the same unit of work.
/// - `display_name` (required): how the item appears in logs.
/// - [`skip_if`](Self::skip_if): discard a fetched result instead of caching
///   it. The item is counted as skipped, but since nothing is cached, the
///   next run fetches it again.
/// - [`transform`](Self::transform): convert the result before caching.
///   Without one, the result is cached as its [`serde_json`] representation.
///
/// # Examples
///
/// ```
/// use resync_sync::Hooks;
///
/// struct Subject { code: String, title: String }
///
/// let hooks = Hooks::new(|s: &Subject| s.code.clone(), |s: &Subject| s.title.clone())
///     // A subject without courses this term might have some next time.
///     .skip_if(|_, courses: &Vec<String>| courses.is_empty())
///     .transform(|courses| serde_json::json!({ "courses": courses }));
/// # let _ = hooks;
/// ```
pub struct Hooks<T, R> {
    cache_key: Extractor<T>,
    display_name: Extractor<T>,
    skip_if: Option<Predicate<T, R>>,
    transform: Option<Transform<R>>,
}
impl<T, R> Hooks<T, R> {
    pub fn new(
        cache_key: impl Fn(&T) -> String + Send + Sync + 'static,
        display_name: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            cache_key: Box::new(cache_key),
            display_name: Box::new(display_name),
            skip_if: None,
            transform: None,
        }
    }

    /// Use the cache key as the display name too.
    pub fn keyed(cache_key: impl Fn(&T) -> String + Clone + Send + Sync + 'static) -> Self {
        Self::new(cache_key.clone(), cache_key)
    }

    pub fn skip_if(mut self, predicate: impl Fn(&T, &R) -> bool + Send + Sync + 'static) -> Self {
        self.skip_if = Some(Box::new(predicate));
        self
    }

    pub fn transform(mut self, transform: impl Fn(R) -> Value + Send + Sync + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    pub(crate) fn cache_key(&self, item: &T) -> String {
        (self.cache_key)(item)
    }

    pub(crate) fn display_name(&self, item: &T) -> String {
        (self.display_name)(item)
    }

    pub(crate) fn should_skip(&self, item: &T, result: &R) -> bool {
        self.skip_if.as_ref().is_some_and(|predicate| predicate(item, result))
    }
}
impl<T, R: Serialize> Hooks<T, R> {
    /// The value to cache for a fetch result.
    pub(crate) fn to_value(&self, result: R) -> Result<Value, serde_json::Error> {
        match &self.transform {
            Some(transform) => Ok(transform(result)),
            None => serde_json::to_value(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keyed_uses_key_as_display_name() {
        let hooks: Hooks<u32, ()> = Hooks::keyed(|n: &u32| format!("item-{n}"));
        assert_eq!(hooks.cache_key(&7), "item-7");
        assert_eq!(hooks.display_name(&7), "item-7");
    }

    #[test]
    fn test_without_optional_hooks() {
        let hooks: Hooks<u32, Vec<u32>> = Hooks::keyed(|n: &u32| n.to_string());
        assert!(!hooks.should_skip(&1, &vec![]));
        assert_eq!(hooks.to_value(vec![1, 2]).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_skip_and_transform() {
        let hooks: Hooks<u32, Vec<u32>> = Hooks::keyed(|n: &u32| n.to_string())
            .skip_if(|_, result: &Vec<u32>| result.is_empty())
            .transform(|result| json!({ "count": result.len() }));
        assert!(hooks.should_skip(&1, &vec![]));
        assert!(!hooks.should_skip(&1, &vec![1]));
        assert_eq!(hooks.to_value(vec![1, 2, 3]).unwrap(), json!({ "count": 3 }));
    }
}
