use std::thread;
use tracing::debug;

use super::queue::{CompletionGuard, QueueCounters, SharedQueue, WorkItem};
use super::worker::{process_item, WorkerContext, WorkerState};
use crate::errors::{SearchError, SearchResult};

/// Worker states and the shared queue's counters after a dynamic run
#[derive(Debug)]
pub struct DynamicRun {
    pub workers: Vec<WorkerState>,
    pub queue: QueueCounters,
}

/// Pool of workers that all pull from one shared queue.
///
/// Idle workers take whatever item is next, so uneven subtrees balance themselves at the
/// cost of contention on the queue lock.
#[derive(Debug, Clone, Copy)]
pub struct DynamicScheduler {
    threads: usize,
}

impl DynamicScheduler {
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    /// Seeds the shared queue with `root` and runs every worker until no work is outstanding
    pub fn run(&self, ctx: WorkerContext<'_>, root: WorkItem) -> SearchResult<DynamicRun> {
        let queue = SharedQueue::seeded(root);

        let workers = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.threads);
            let mut failure = None;

            for id in 0..self.threads {
                let queue = &queue;
                let spawned = thread::Builder::new()
                    .name(format!("treescout-worker-{id}"))
                    .spawn_scoped(scope, move || run_worker(ctx, queue, id));
                match spawned {
                    Ok(handle) => handles.push((id, handle)),
                    Err(e) => {
                        // Stop the workers already running; the run is failing anyway
                        queue.abort();
                        failure = Some(SearchError::resource_exhausted(id, e));
                        break;
                    }
                }
            }

            let mut workers = Vec::with_capacity(handles.len());
            for (id, handle) in handles {
                match handle.join() {
                    Ok(state) => workers.push(state),
                    Err(_) => {
                        failure.get_or_insert(SearchError::WorkerPanicked(id));
                    }
                }
            }

            match failure {
                Some(e) => Err(e),
                None => Ok(workers),
            }
        })?;

        if ctx.is_aborted() || queue.is_aborted() {
            return Err(SearchError::Cancelled);
        }

        let counters = queue.counters();
        debug_assert_eq!(queue.outstanding(), 0);
        debug_assert_eq!(counters.enqueued, counters.drained);
        debug!(
            "Dynamic run complete: {} items enqueued, {} drained",
            counters.enqueued, counters.drained
        );

        Ok(DynamicRun {
            workers,
            queue: counters,
        })
    }
}

fn run_worker(ctx: WorkerContext<'_>, queue: &SharedQueue, id: usize) -> WorkerState {
    let mut state = WorkerState::new(id);
    let mut processed = 0u64;

    loop {
        if ctx.is_aborted() {
            queue.abort();
            break;
        }
        let Some(item) = queue.pop() else {
            break;
        };
        let guard = CompletionGuard::new(queue);
        let children = process_item(ctx, &item, &mut state);
        queue.push_batch(children);
        drop(guard);
        processed += 1;
    }

    debug!("Worker {} processed {} items", id, processed);
    state.finish(QueueCounters::default())
}
