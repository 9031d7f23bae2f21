use crate::config::SyncConfig;
use crate::stats::SyncStats;
use std::fmt;

/// Human-readable summary of a finished run.
///
/// ```
/// use resync_sync::{Report, SyncConfig, SyncStats};
///
/// let stats = SyncStats { total: 3, processed: 3, total_items_found: 9, ..SyncStats::default() };
/// let config = SyncConfig::new("courses");
/// let report = Report::new(&stats, &config).to_string();
/// assert!(report.contains("Completed successfully"));
/// ```
pub struct Report<'a> {
    stats: &'a SyncStats,
    config: &'a SyncConfig,
}
impl<'a> Report<'a> {
    pub fn new(stats: &'a SyncStats, config: &'a SyncConfig) -> Self {
        Self { stats, config }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats;
        let rows: [(&str, String); 10] = [
            ("Total items", stats.total.to_string()),
            ("Processed", stats.processed.to_string()),
            ("Skipped (cached)", stats.cached().to_string()),
            ("Skipped (filtered)", stats.filtered.to_string()),
            ("Errors", stats.errors.to_string()),
            ("Items found", stats.total_items_found.to_string()),
            ("Avg items/processed", format!("{:.1}", stats.avg_items())),
            ("Batches", stats.concurrent_batches.to_string()),
            ("Total time", format!("{:.2}s", stats.total_time.as_secs_f64())),
            ("Avg time/item", format!("{:.3}s", stats.avg_time().as_secs_f64())),
        ];
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or_default();

        writeln!(f, "{} sync report", self.config.name)?;
        for (label, value) in &rows {
            writeln!(f, "  {label:<width$}  {value:>10}")?;
        }
        if let Some(location) = &self.config.cache_location {
            writeln!(f, "  Cache: {}", location.display())?;
        }

        if stats.interrupted {
            write!(f, "Interrupted: {} items left for the next run", stats.unprocessed())
        } else if stats.errors > 0 {
            write!(f, "Completed with {} errors; rerun to retry them", stats.errors)
        } else {
            write!(f, "Completed successfully")
        }
    }
}
