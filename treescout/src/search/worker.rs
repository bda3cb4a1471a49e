use std::path::Path;
use tracing::{debug, trace};

use super::classifier::{classify, Classification};
use super::engine::AbortHandle;
use super::processor::FileProcessor;
use super::queue::{LocalQueue, QueueCounters, WorkItem};
use crate::errors::{SearchError, SearchResult};
use crate::metrics::ScanMetrics;

/// Everything a worker needs, borrowed from the engine for the length of a run
#[derive(Debug, Clone, Copy)]
pub struct WorkerContext<'a> {
    processor: &'a FileProcessor,
    abort: &'a AbortHandle,
}

impl<'a> WorkerContext<'a> {
    pub fn new(processor: &'a FileProcessor, abort: &'a AbortHandle) -> Self {
        Self { processor, abort }
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }
}

/// Per-thread scan state.
///
/// Written only by the owning thread; the aggregator reads it after the thread has been
/// joined, at which point `active` is false.
#[derive(Debug, Clone)]
pub struct WorkerState {
    id: usize,
    metrics: ScanMetrics,
    active: bool,
}

impl WorkerState {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            metrics: ScanMetrics::new(),
            active: true,
        }
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    #[cfg(test)]
    pub(crate) fn metrics_mut(&mut self) -> &mut ScanMetrics {
        &mut self.metrics
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Leaves the work loop, folding in the counters of the private queue it drained
    pub fn finish(mut self, queue: QueueCounters) -> Self {
        self.metrics.items_enqueued += queue.enqueued;
        self.metrics.items_drained += queue.drained;
        self.active = false;
        debug!(
            "Worker {} finished: {} files, {} occurrences",
            self.id, self.metrics.files_searched, self.metrics.occurrences
        );
        self
    }
}

/// Classifies one item and either searches it or returns its children.
///
/// Every failure is recorded on `state` and never propagated, so one bad path cannot stop
/// the run.
pub fn process_item(
    ctx: WorkerContext<'_>,
    item: &WorkItem,
    state: &mut WorkerState,
) -> Vec<WorkItem> {
    let path = item.path();
    apply_classification(ctx, path, classify(path), state)
}

fn apply_classification(
    ctx: WorkerContext<'_>,
    path: &Path,
    classification: Classification,
    state: &mut WorkerState,
) -> Vec<WorkItem> {
    match classification {
        Classification::Directory {
            children,
            listing_error,
        } => {
            state.metrics.record_directory();
            if listing_error.is_some() {
                state.metrics.record_unreadable();
            }
            children
        }
        Classification::RegularFile => {
            match ctx.processor.process_file(path) {
                Ok(outcome) => {
                    trace!(
                        "Worker {} found {} occurrences in {}",
                        state.id,
                        outcome.occurrences,
                        path.display()
                    );
                    state
                        .metrics
                        .record_file(outcome.occurrences, outcome.oversized_lines);
                }
                Err(e) => {
                    debug!("Unable to search file {}: {}", path.display(), e);
                    state.metrics.record_unreadable();
                }
            }
            Vec::new()
        }
        Classification::Skipped => {
            state.metrics.record_skipped();
            Vec::new()
        }
        Classification::Unreadable(_) => {
            state.metrics.record_unreadable();
            Vec::new()
        }
    }
}

/// Drains a private queue to completion, pushing children back onto it
pub fn drain_local(
    ctx: WorkerContext<'_>,
    queue: &mut LocalQueue,
    state: &mut WorkerState,
) -> SearchResult<()> {
    loop {
        if ctx.is_aborted() {
            return Err(SearchError::Cancelled);
        }
        let Some(item) = queue.pop() else {
            return Ok(());
        };
        let children = process_item(ctx, &item, state);
        queue.extend(children);
    }
}

/// Runs the whole scan on the calling thread
pub fn run_serial(ctx: WorkerContext<'_>, root: WorkItem) -> SearchResult<WorkerState> {
    let mut queue = LocalQueue::new();
    queue.push(root);
    let mut state = WorkerState::new(0);
    drain_local(ctx, &mut queue, &mut state)?;
    Ok(state.finish(queue.counters()))
}
