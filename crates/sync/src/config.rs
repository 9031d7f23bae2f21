//! Per-run sync configuration.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for one sync run.
///
/// Only `batch_size` and `batch_delay` affect behaviour; the rest is
/// presentation. Deserializes with every field optional, `batch_delay` given
/// in (fractional) seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Display name for the run, used in logs and the report.
    pub name: String,
    /// Number of items fetched concurrently per batch.
    pub batch_size: NonZeroUsize,
    /// Pause after each batch (except the last) to go easy on whatever the
    /// fetch function talks to.
    #[serde(with = "duration_secs")]
    pub batch_delay: Duration,
    /// Where the cache lives; shown in the report only.
    pub cache_location: Option<PathBuf>,
    /// Log per-item and per-batch progress at `info` instead of `debug`.
    pub show_progress: bool,
    /// Log the [`Report`](crate::Report) when the run finishes.
    pub show_stats: bool,
}
impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            name: "sync".to_string(),
            batch_size: NonZeroUsize::MIN,
            batch_delay: Duration::from_secs(1),
            cache_location: None,
            show_progress: true,
            show_stats: true,
        }
    }
}
impl SyncConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn with_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_batch_delay(mut self, batch_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }

    pub fn with_cache_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.cache_location = Some(location.into());
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_stats(mut self, show: bool) -> Self {
        self.show_stats = show;
        self
    }
}

/// (De)serialize a [`Duration`] as a number of seconds (`1.5` = 1500ms).
///
/// Negative, infinite and NaN values are rejected.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(seconds)
            .map_err(|e| serde::de::Error::custom(format!("invalid duration `{seconds}`: {e}")))
    }
}
