use serde::Serialize;

use crate::metrics::ScanMetrics;
use crate::search::engine::{ModeSelection, ScanMode};
use crate::search::queue::QueueCounters;
use crate::search::worker::WorkerState;

/// The outcome of one search run.
///
/// Built once by the engine after every worker has been joined. The occurrence total and the
/// unreadable-path count depend only on the tree and the needle, never on the mode or the
/// thread count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineResult {
    /// Mode the run actually used
    pub mode: ScanMode,
    /// Worker threads the run used (1 for serial)
    pub threads: usize,
    /// Unrecognized mode name that was replaced by static
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_from: Option<String>,
    /// Counters summed over every worker
    #[serde(flatten)]
    pub metrics: ScanMetrics,
}

impl EngineResult {
    /// Sums worker states into a single result.
    ///
    /// `shared_queue` carries the counters of the dynamic scheduler's shared queue; private
    /// queue counters are already part of each worker's metrics.
    pub fn aggregate(
        workers: &[WorkerState],
        shared_queue: QueueCounters,
        selection: ModeSelection,
        threads: usize,
    ) -> Self {
        debug_assert!(
            workers.iter().all(|w| !w.is_active()),
            "aggregating a worker that is still running"
        );

        let mut metrics = ScanMetrics::new();
        for worker in workers {
            metrics += worker.metrics();
        }
        metrics.items_enqueued += shared_queue.enqueued;
        metrics.items_drained += shared_queue.drained;

        Self {
            mode: selection.mode,
            threads,
            fallback_from: selection.fallback_from,
            metrics,
        }
    }

    /// Total needle occurrences across all files
    pub fn total_occurrences(&self) -> u64 {
        self.metrics.occurrences
    }

    /// Paths skipped because they could not be read
    pub fn unreadable_paths(&self) -> u64 {
        self.metrics.unreadable_paths
    }

    /// True when every enqueued work item was drained exactly once
    pub fn is_balanced(&self) -> bool {
        self.metrics.items_enqueued == self.metrics.items_drained
    }

    /// True when the requested mode was unknown and static was used instead
    pub fn fell_back(&self) -> bool {
        self.fallback_from.is_some()
    }
}
