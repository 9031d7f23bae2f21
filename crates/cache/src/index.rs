//! The index ("overview") of a sharded cache.
//!
//! The index maps every key to a small amount of metadata. It is a derived
//! artifact: the data shards are authoritative, and the index is repaired to
//! match them whenever a cache is loaded.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};

/// Insertion-ordered, so `keys()` lists entries in the order they were first written.
pub(crate) type Index = IndexMap<String, IndexEntry>;

/// Metadata recorded in the index for each cached key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// When the key's value was last written.
    #[serde(serialize_with = "time::serde::rfc3339::serialize", deserialize_with = "deserialize_timestamp")]
    pub last_synced: OffsetDateTime,
}
impl IndexEntry {
    pub fn now() -> Self {
        Self { last_synced: OffsetDateTime::now_utc() }
    }
}

// Older caches were written with naive local timestamps, no offset. Accept
// them (as UTC) rather than declaring the whole index corrupt.
fn deserialize_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp `{raw}`")))
}

fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339).ok().or_else(|| {
        PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT).ok().map(PrimitiveDateTime::assume_utc)
    })
}

/// What [`ShardedCache::load()`](crate::ShardedCache::load) had to repair.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Keys that were in the index but had no data shard.
    pub dropped: Vec<String>,
    /// Keys that had a data shard but were missing from the index.
    pub adopted: Vec<String>,
    /// Temporary files left behind by interrupted writes.
    pub cleaned: usize,
}
impl Reconciliation {
    /// Returns `true` if the index and shards already agreed.
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.adopted.is_empty() && self.cleaned == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::Month;

    #[rstest]
    #[case("2025-03-14T15:09:26Z")]
    #[case("2025-03-14T15:09:26.535897+00:00")]
    #[case("2025-03-14T15:09:26.535897")]
    #[case("2025-03-14T15:09:26")]
    fn test_parse_timestamp(#[case] raw: &str) {
        let parsed = parse_timestamp(raw).unwrap();
        assert_eq!(parsed.year(), 2025);
        assert_eq!(parsed.month(), Month::March);
        assert_eq!(parsed.day(), 14);
        assert_eq!(parsed.hour(), 15);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_entry_serializes_as_last_synced() {
        let entry = IndexEntry { last_synced: OffsetDateTime::UNIX_EPOCH };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"last_synced":"1970-01-01T00:00:00Z"}"#);
        let back: IndexEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_index_keeps_insertion_order() {
        let json = r#"{"zeta":{"last_synced":"2025-01-01T00:00:00"},"alpha":{"last_synced":"2025-01-02T00:00:00"}}"#;
        let index: Index = serde_json::from_str(json).unwrap();
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }
}
