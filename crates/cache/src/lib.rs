//! Durable key/document cache for resumable syncs.
//!
//! The cache is what makes a sync resumable: an item whose key is present is
//! considered done and will not be fetched again. Values are arbitrary JSON
//! documents ([`serde_json::Value`]).
//!
//! # Backends
//! - [`ShardedCache`]: a small index file (`overview.json`) plus one data
//!   shard per key (`data/{key}.json`). The shards are the source of truth;
//!   the index is rebuilt from them on [`load()`](ShardedCache::load).
//! - [`FileCache`]: every entry in a single JSON document.
//! - [`MemoryCache`]: nothing touches the disk.
//!
//! All backends implement [`Cache`] and are safe to share between the
//! concurrently running units of a sync batch.

pub mod backend;
pub mod error;
mod index;
mod key;
mod layout;

pub use crate::backend::{Cache, FileCache, MemoryCache, ShardedCache};
pub use crate::index::{IndexEntry, Reconciliation};
pub use crate::key::validate as validate_key;
pub use crate::layout::CacheLayout;
pub use serde_json::Value;
use std::sync::Arc;

pub type CacheHandle = Arc<dyn Cache>;
