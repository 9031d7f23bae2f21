//! The sync loop.
//!
//! [`Orchestrator::stream`] does the work and reports it as [`SyncEvent`]s;
//! [`Orchestrator::sync`] drives that stream to completion, logging progress
//! and tallying [`SyncStats`].

mod unit;

use crate::config::SyncConfig;
use crate::error::{ErrorKind, Result};
use crate::hooks::Hooks;
use crate::report::Report;
use crate::shutdown::Shutdown;
use crate::stats::SyncStats;
use async_stream::stream;
use futures::{Stream, StreamExt};
use resync_cache::Cache;
use serde::Serialize;
use std::fmt::Display;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Progress events emitted by [`Orchestrator::stream`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once, with the number of items.
/// 2. For each batch: [`BatchStarted`](Self::BatchStarted), one
///    [`Item`](Self::Item) per item in the batch (in input order), then
///    [`BatchComplete`](Self::BatchComplete).
/// 3. [`Interrupted`](Self::Interrupted): only if shutdown was requested
///    before every batch had started.
/// 4. [`Complete`](Self::Complete): exactly once, signalling the stream is
///    finished.
///
/// A cache error terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Started { total: u64 },
    /// Batches are numbered from 1.
    BatchStarted { batch: u64, size: usize },
    Item(ItemReport),
    BatchComplete { batch: u64 },
    /// Shutdown was requested; `remaining` items were never started.
    Interrupted { remaining: u64 },
    Complete,
}

/// What happened to a single item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    pub key: String,
    pub display_name: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Already cached; not fetched.
    Cached,
    /// Fetched, but the skip policy rejected the result. Not cached.
    Filtered,
    /// Fetched and cached. `items` is the length of a list result, 1 for
    /// anything else.
    Fetched { items: u64 },
    /// The fetch failed (or its result could not be cached). Not cached.
    Failed(String),
}

/// Pulls every item's data into a cache, in batches.
///
/// See the [crate documentation](crate) for an overview.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: SyncConfig,
    shutdown: Shutdown,
}
impl Orchestrator {
    pub fn new(config: SyncConfig) -> Self {
        Self { config, shutdown: Shutdown::new() }
    }

    /// Share a shutdown signal with something else, such as several
    /// orchestrators that should all stop on the same Ctrl+C.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Stop gracefully on Ctrl+C. See [`Shutdown::install_signal_handler`].
    pub fn install_signal_handler(&self) -> JoinHandle<()> {
        self.shutdown.install_signal_handler()
    }

    /// Streams [`SyncEvent`]s while syncing `items` into `cache`.
    ///
    /// Items are taken [`batch_size`](SyncConfig::batch_size) at a time; the
    /// items of a batch are processed concurrently and the next batch does not
    /// start until all of them have finished. Shutdown is only checked before
    /// a batch starts, so a batch in flight always runs to completion.
    ///
    /// Failed fetches are reported as [`Outcome::Failed`] and never end the
    /// stream. A cache error does: the rest of the batch still finishes, its
    /// items are reported, and then the error is yielded as the last item.
    pub fn stream<'a, T, R, E, F, Fut>(
        &'a self,
        items: &'a [T],
        fetch: &'a F,
        cache: &'a dyn Cache,
        hooks: &'a Hooks<T, R>,
    ) -> impl Stream<Item = Result<SyncEvent>> + 'a
    where
        R: Serialize,
        E: Display,
        F: Fn(&T) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
    {
        let batch_size = self.config.batch_size.get();
        let batch_delay = self.config.batch_delay;
        // `rustfmt` does not format macros that use braces. Wrap in parentheses!
        stream!({
            let total = to_u64(items.len());
            yield Ok(SyncEvent::Started { total });

            let batches = items.chunks(batch_size).count();
            let mut started = 0u64;
            for (index, batch) in items.chunks(batch_size).enumerate() {
                if self.shutdown.is_requested() {
                    yield Ok(SyncEvent::Interrupted { remaining: total - started });
                    break;
                }

                let number = to_u64(index) + 1;
                started += to_u64(batch.len());
                yield Ok(SyncEvent::BatchStarted { batch: number, size: batch.len() });

                let units = batch.iter().map(|item| unit::process_item(item, fetch, cache, hooks));
                let mut failure = None;
                for result in futures::future::join_all(units).await {
                    match result {
                        Ok(report) => yield Ok(SyncEvent::Item(report)),
                        Err(e) => {
                            failure.get_or_insert(e);
                        },
                    }
                }
                if let Some(e) = failure {
                    yield Err(e.raise(ErrorKind::Cache));
                    return;
                }
                yield Ok(SyncEvent::BatchComplete { batch: number });

                if !batch_delay.is_zero() && index + 1 < batches {
                    tokio::select! {
                        () = tokio::time::sleep(batch_delay) => {},
                        () = self.shutdown.cancelled() => {},
                    }
                }
            }

            yield Ok(SyncEvent::Complete);
        })
    }

    /// Sync `items` into `cache`, returning the run's statistics.
    ///
    /// Progress is logged as it happens, and the [`Report`] once the run is
    /// over (see [`SyncConfig::show_progress`] and [`SyncConfig::show_stats`]).
    /// An interrupted run is not an error: it returns normally with
    /// [`SyncStats::interrupted`] set, and the next run resumes from the
    /// cache.
    ///
    /// # Errors
    /// Only a failing cache ends the run with an error.
    pub async fn sync<T, R, E, F, Fut>(
        &self,
        items: &[T],
        fetch: F,
        cache: &dyn Cache,
        hooks: &Hooks<T, R>,
    ) -> Result<SyncStats>
    where
        R: Serialize,
        E: Display,
        F: Fn(&T) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
    {
        let name = self.config.name.as_str();
        tracing::info!(sync = name, cache = cache.name(), items = items.len(), "starting sync");

        let started = Instant::now();
        let mut stats = SyncStats::default();
        let mut events = Box::pin(self.stream(items, &fetch, cache, hooks));
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(sync = name, cache = cache.name(), error = ?e, "aborting sync");
                    return Err(e);
                },
            };
            stats.record(&event);
            self.log(&event);
        }
        stats.total_time = started.elapsed();

        if self.config.show_stats {
            tracing::info!(sync = name, "\n{}", Report::new(&stats, &self.config));
        }
        Ok(stats)
    }

    fn log(&self, event: &SyncEvent) {
        let name = self.config.name.as_str();
        let progress = self.config.show_progress;
        match event {
            SyncEvent::Started { .. } | SyncEvent::Complete => {},
            SyncEvent::BatchStarted { batch, size } => {
                if progress {
                    tracing::info!(sync = name, batch, size, "starting batch");
                } else {
                    tracing::debug!(sync = name, batch, size, "starting batch");
                }
            },
            SyncEvent::BatchComplete { batch } => tracing::debug!(sync = name, batch, "batch complete"),
            SyncEvent::Item(report) => log_item(name, report, progress),
            SyncEvent::Interrupted { remaining } => {
                tracing::warn!(sync = name, remaining, "sync interrupted, rerun to resume");
            },
        }
    }
}

fn log_item(name: &str, report: &ItemReport, progress: bool) {
    let ItemReport { key, display_name: item, outcome } = report;
    match outcome {
        Outcome::Failed(error) => tracing::warn!(sync = name, %item, %key, %error, "fetch failed"),
        _ if !progress => tracing::trace!(sync = name, %item, %key, ?outcome, "item done"),
        Outcome::Cached => tracing::debug!(sync = name, %item, %key, "already cached"),
        Outcome::Filtered => tracing::debug!(sync = name, %item, %key, "skipped by policy, not cached"),
        Outcome::Fetched { items } => tracing::info!(sync = name, %item, %key, items, "fetched"),
    }
}

// Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
fn to_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}
