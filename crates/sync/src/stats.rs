use crate::orchestrator::{Outcome, SyncEvent};
use std::time::Duration;

/// Counters for a single [`sync()`](crate::Orchestrator::sync) run.
///
/// Created when the run starts, only ever incremented while it runs, and
/// read-only once it has been returned.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncStats {
    /// Number of items handed to the run.
    pub total: u64,
    /// Items fetched and cached.
    pub processed: u64,
    /// Items not fetched (already cached) or not cached (skip policy).
    pub skipped: u64,
    /// The part of `skipped` caused by the skip policy. These weren't cached
    /// and will be fetched again next run.
    pub filtered: u64,
    /// Items whose fetch failed.
    pub errors: u64,
    /// Sum of result sizes over processed items.
    pub total_items_found: u64,
    /// Batches started.
    pub concurrent_batches: u64,
    /// Wall-clock duration of the run.
    pub total_time: Duration,
    /// The run stopped early because shutdown was requested.
    pub interrupted: bool,
}
impl SyncStats {
    /// Skipped because the key was already cached.
    pub fn cached(&self) -> u64 {
        self.skipped.saturating_sub(self.filtered)
    }

    /// Items that reached an outcome (processed, skipped or failed).
    pub fn completed(&self) -> u64 {
        self.processed + self.skipped + self.errors
    }

    /// Items never attempted because the run was interrupted.
    pub fn unprocessed(&self) -> u64 {
        self.total.saturating_sub(self.completed())
    }

    /// Average wall-clock time per item handed to the run.
    pub fn avg_time(&self) -> Duration {
        match self.total {
            0 => Duration::ZERO,
            total => self.total_time.div_f64(total as f64),
        }
    }

    /// Average result size per processed item.
    pub fn avg_items(&self) -> f64 {
        match self.processed {
            0 => 0.0,
            processed => self.total_items_found as f64 / processed as f64,
        }
    }

    /// No errors and not interrupted.
    pub fn is_success(&self) -> bool {
        self.errors == 0 && !self.interrupted
    }

    pub(crate) fn record(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::Started { total } => self.total = *total,
            SyncEvent::BatchStarted { .. } => self.concurrent_batches += 1,
            SyncEvent::Item(report) => match report.outcome {
                Outcome::Cached => self.skipped += 1,
                Outcome::Filtered => {
                    self.skipped += 1;
                    self.filtered += 1;
                },
                Outcome::Fetched { items } => {
                    self.processed += 1;
                    self.total_items_found += items;
                },
                Outcome::Failed(_) => self.errors += 1,
            },
            SyncEvent::Interrupted { .. } => self.interrupted = true,
            SyncEvent::BatchComplete { .. } | SyncEvent::Complete => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::ItemReport;

    fn item(outcome: Outcome) -> SyncEvent {
        SyncEvent::Item(ItemReport {
            key: "k".to_string(),
            display_name: "k".to_string(),
            outcome,
        })
    }

    #[test]
    fn test_record() {
        let mut stats = SyncStats::default();
        stats.record(&SyncEvent::Started { total: 6 });
        stats.record(&SyncEvent::BatchStarted { batch: 1, size: 5 });
        stats.record(&item(Outcome::Fetched { items: 3 }));
        stats.record(&item(Outcome::Fetched { items: 1 }));
        stats.record(&item(Outcome::Cached));
        stats.record(&item(Outcome::Filtered));
        stats.record(&item(Outcome::Failed("timeout".to_string())));
        stats.record(&SyncEvent::BatchComplete { batch: 1 });
        stats.record(&SyncEvent::Interrupted { remaining: 1 });

        assert_eq!(stats.total, 6);
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.filtered, 1);
        assert_eq!(stats.cached(), 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.total_items_found, 4);
        assert_eq!(stats.concurrent_batches, 1);
        assert_eq!(stats.unprocessed(), 1);
        assert!(stats.interrupted);
        assert!(!stats.is_success());
    }

    #[test]
    fn test_cached_with_inconsistent_counts() {
        let stats = SyncStats { skipped: 0, filtered: 1, ..SyncStats::default() };
        assert_eq!(stats.cached(), 0);
    }

    #[test]
    fn test_averages() {
        let stats = SyncStats {
            total: 4,
            processed: 2,
            total_items_found: 5,
            total_time: Duration::from_secs(2),
            ..SyncStats::default()
        };
        assert_eq!(stats.avg_time(), Duration::from_millis(500));
        assert_eq!(stats.avg_items(), 2.5);
    }

    #[test]
    fn test_averages_of_empty_run() {
        let stats = SyncStats::default();
        assert_eq!(stats.avg_time(), Duration::ZERO);
        assert_eq!(stats.avg_items(), 0.0);
        assert!(stats.is_success());
    }
}
