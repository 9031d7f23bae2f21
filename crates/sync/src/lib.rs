//! Batched, cache-aware, cancellable synchronization.
//!
//! An [`Orchestrator`] takes a list of items and an async fetch function and
//! pulls every item's data into a [`Cache`](resync_cache::Cache):
//!
//! 1. Items are split into batches of [`SyncConfig::batch_size`]; every item
//!    in a batch is fetched concurrently, and the next batch only starts once
//!    the whole batch has finished.
//! 2. Items whose key is already cached are skipped without fetching, so a
//!    rerun after an interruption picks up where the last one stopped.
//! 3. A failed fetch is counted and logged, never fatal.
//! 4. A [`Shutdown`] request (Ctrl+C) is honoured between batches.
//!
//! # Examples
//!
//! ```
//! use resync_cache::MemoryCache;
//! use resync_sync::{Hooks, Orchestrator, SyncConfig};
//! use std::num::NonZeroUsize;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let subjects = vec!["CSE".to_string(), "MATH".to_string()];
//! let config = SyncConfig::new("courses")
//!     .with_batch_size(NonZeroUsize::new(5).unwrap())
//!     .with_batch_delay(Duration::ZERO);
//! let hooks = Hooks::keyed(|subject: &String| subject.clone());
//! let fetch = |subject: &String| {
//!     let subject = subject.clone();
//!     async move { Ok::<_, std::io::Error>(vec![format!("{subject} 101")]) }
//! };
//!
//! let cache = MemoryCache::new();
//! let stats = Orchestrator::new(config).sync(&subjects, fetch, &cache, &hooks).await?;
//! assert_eq!(stats.processed, 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod hooks;
mod orchestrator;
mod report;
mod shutdown;
mod stats;

pub use crate::config::SyncConfig;
pub use crate::hooks::Hooks;
pub use crate::orchestrator::{ItemReport, Orchestrator, Outcome, SyncEvent};
pub use crate::report::Report;
pub use crate::shutdown::{FORCE_EXIT_CODE, Shutdown};
pub use crate::stats::SyncStats;
