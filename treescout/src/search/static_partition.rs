use std::thread;
use tracing::debug;

use super::queue::{LocalQueue, WorkItem};
use super::worker::{drain_local, process_item, WorkerContext, WorkerState};
use crate::errors::{SearchError, SearchResult};

/// Splits the tree into independent chunks up front and gives each thread its own.
///
/// The calling thread expands the tree breadth-first until the frontier holds at least one
/// item per worker (or the tree runs out), processing any files it meets on the way. The
/// frontier is then dealt round-robin into private queues and every worker drains its own
/// queue with no further sharing. Large subtrees landing on one worker are not rebalanced.
#[derive(Debug, Clone, Copy)]
pub struct StaticPartitioner {
    threads: usize,
}

impl StaticPartitioner {
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    /// Expands the tree until there is work for every thread.
    ///
    /// Returns the state of the calling thread's pre-expansion work and one private queue per
    /// worker; some queues are empty when the tree has fewer items than workers.
    pub fn partition(
        &self,
        ctx: WorkerContext<'_>,
        root: WorkItem,
    ) -> SearchResult<(WorkerState, Vec<LocalQueue>)> {
        let mut frontier = LocalQueue::new();
        frontier.push(root);
        // The coordinator takes the id after the last worker
        let mut state = WorkerState::new(self.threads);

        while !frontier.is_empty() && frontier.len() < self.threads {
            if ctx.is_aborted() {
                return Err(SearchError::Cancelled);
            }
            let Some(item) = frontier.pop() else {
                break;
            };
            let children = process_item(ctx, &item, &mut state);
            frontier.extend(children);
        }

        debug!(
            "Static partition: {} frontier items for {} threads",
            frontier.len(),
            self.threads
        );
        let (counters, parts) = frontier.deal(self.threads);
        Ok((state.finish(counters), parts))
    }

    /// Partitions the tree and drains every part on its own thread
    pub fn run(&self, ctx: WorkerContext<'_>, root: WorkItem) -> SearchResult<Vec<WorkerState>> {
        let (coordinator, parts) = self.partition(ctx, root)?;

        let mut states = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(parts.len());
            let mut spawn_error = None;

            for (id, mut queue) in parts.into_iter().enumerate() {
                debug!("Worker {} assigned {} items", id, queue.len());
                let spawned = thread::Builder::new()
                    .name(format!("treescout-worker-{id}"))
                    .spawn_scoped(scope, move || -> SearchResult<WorkerState> {
                        let mut state = WorkerState::new(id);
                        drain_local(ctx, &mut queue, &mut state)?;
                        Ok(state.finish(queue.counters()))
                    });
                match spawned {
                    Ok(handle) => handles.push((id, handle)),
                    Err(e) => {
                        spawn_error = Some(SearchError::resource_exhausted(id, e));
                        break;
                    }
                }
            }

            let mut states = Vec::with_capacity(handles.len() + 1);
            let mut failure = spawn_error;
            for (id, handle) in handles {
                match handle.join() {
                    Ok(Ok(state)) => states.push(state),
                    Ok(Err(e)) => {
                        failure.get_or_insert(e);
                    }
                    Err(_) => {
                        failure.get_or_insert(SearchError::WorkerPanicked(id));
                    }
                }
            }

            match failure {
                Some(e) => Err(e),
                None => Ok(states),
            }
        })?;

        states.push(coordinator);
        Ok(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::engine::AbortHandle;
    use crate::search::matcher::NeedleMatcher;
    use crate::search::processor::FileProcessor;
    use std::fs;
    use tempfile::tempdir;

    fn build_tree(root: &std::path::Path) {
        for d in 0..3 {
            let sub = root.join(format!("dir_{d}"));
            fs::create_dir_all(sub.join("nested")).unwrap();
            fs::write(sub.join("a.txt"), "cat dog cat").unwrap();
            fs::write(sub.join("nested/b.txt"), "bobcat").unwrap();
        }
    }

    #[test]
    fn test_partition_reaches_thread_count() {
        let dir = tempdir().unwrap();
        build_tree(dir.path());

        let processor = FileProcessor::new(NeedleMatcher::new("cat"), 8192);
        let abort = AbortHandle::new();
        let ctx = WorkerContext::new(&processor, &abort);

        let (_, parts) = StaticPartitioner::new(3)
            .partition(ctx, WorkItem::new(dir.path()))
            .unwrap();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| !p.is_empty()));
    }

    #[test]
    fn test_run_counts_everything_once() {
        let dir = tempdir().unwrap();
        build_tree(dir.path());

        let processor = FileProcessor::new(NeedleMatcher::new("cat"), 8192);
        let abort = AbortHandle::new();
        let ctx = WorkerContext::new(&processor, &abort);

        for threads in [1, 2, 5, 32] {
            let states = StaticPartitioner::new(threads)
                .run(ctx, WorkItem::new(dir.path()))
                .unwrap();
            assert_eq!(states.len(), threads + 1);

            let occurrences: u64 = states.iter().map(|s| s.metrics().occurrences).sum();
            let files: u64 = states.iter().map(|s| s.metrics().files_searched).sum();
            let enqueued: u64 = states.iter().map(|s| s.metrics().items_enqueued).sum();
            let drained: u64 = states.iter().map(|s| s.metrics().items_drained).sum();
            assert_eq!(occurrences, 9);
            assert_eq!(files, 6);
            assert_eq!(enqueued, drained);
            assert!(states.iter().all(|s| !s.is_active()));
        }
    }

    #[test]
    fn test_excess_threads_on_single_file_root() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("only.txt");
        fs::write(&file_path, "cat").unwrap();

        let processor = FileProcessor::new(NeedleMatcher::new("cat"), 8192);
        let abort = AbortHandle::new();
        let ctx = WorkerContext::new(&processor, &abort);

        let states = StaticPartitioner::new(8)
            .run(ctx, WorkItem::new(&file_path))
            .unwrap();
        let occurrences: u64 = states.iter().map(|s| s.metrics().occurrences).sum();
        assert_eq!(occurrences, 1);
    }
}
