//! Work queues for pending filesystem paths.
//!
//! [`LocalQueue`] is a plain FIFO owned by a single thread (serial mode and each static
//! partition). [`SharedQueue`] is the one queue all dynamic workers pull from: a mutex over
//! the items plus a condition variable that parks idle workers until more work is pushed or
//! the [`TerminationDetector`] reports that nothing is left.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use super::termination::TerminationDetector;

/// One filesystem path waiting to be classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    path: PathBuf,
}

impl WorkItem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Snapshot of a queue's monotonic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounters {
    pub enqueued: u64,
    pub drained: u64,
}

/// Unsynchronized FIFO owned by exactly one thread
#[derive(Debug, Default)]
pub struct LocalQueue {
    items: VecDeque<WorkItem>,
    counters: QueueCounters,
}

impl LocalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: WorkItem) {
        self.counters.enqueued += 1;
        self.items.push_back(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = WorkItem>) {
        for item in items {
            self.push(item);
        }
    }

    pub fn pop(&mut self) -> Option<WorkItem> {
        let item = self.items.pop_front()?;
        self.counters.drained += 1;
        Some(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn counters(&self) -> QueueCounters {
        self.counters
    }

    /// Deals the remaining items round-robin into `parts` fresh queues.
    ///
    /// Moved items are neither drained from this queue nor enqueued on the new ones, so the
    /// returned counters plus the counters of the parts still account for each item once.
    pub fn deal(self, parts: usize) -> (QueueCounters, Vec<LocalQueue>) {
        let parts = parts.max(1);
        let mut queues: Vec<LocalQueue> = (0..parts).map(|_| LocalQueue::new()).collect();
        for (index, item) in self.items.into_iter().enumerate() {
            queues[index % parts].items.push_back(item);
        }
        (self.counters, queues)
    }
}

#[derive(Debug, Default)]
struct SharedState {
    items: VecDeque<WorkItem>,
    detector: TerminationDetector,
    counters: QueueCounters,
    aborted: bool,
}

/// FIFO shared by all dynamic workers.
///
/// Every push, pop and counter update happens under one lock, so no update is ever
/// observed half-done. Callers must pair every successful [`pop`](Self::pop) with exactly
/// one [`complete`](Self::complete) after any children have been pushed.
#[derive(Debug, Default)]
pub struct SharedQueue {
    state: Mutex<SharedState>,
    available: Condvar,
}

impl SharedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue holding a single root item
    pub fn seeded(root: WorkItem) -> Self {
        let queue = Self::new();
        queue.push(root);
        queue
    }

    /// Lock state with poison recovery.
    ///
    /// State updates never panic half-way, so a poisoned lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pushes one item and wakes one waiting worker
    pub fn push(&self, item: WorkItem) {
        let mut state = self.lock();
        state.detector.register(1);
        state.counters.enqueued += 1;
        state.items.push_back(item);
        drop(state);
        self.available.notify_one();
    }

    /// Pushes all children of one directory under a single lock acquisition
    pub fn push_batch(&self, items: Vec<WorkItem>) {
        if items.is_empty() {
            return;
        }
        let count = items.len();
        let mut state = self.lock();
        state.detector.register(count);
        state.counters.enqueued += count as u64;
        state.items.extend(items);
        drop(state);
        if count == 1 {
            self.available.notify_one();
        } else {
            self.available.notify_all();
        }
    }

    /// Takes the oldest item, waiting while the queue is empty but work is outstanding.
    ///
    /// Returns `None` once every pushed item has completed or the queue was aborted.
    pub fn pop(&self) -> Option<WorkItem> {
        let mut state = self.lock();
        loop {
            if state.aborted {
                return None;
            }
            if let Some(item) = state.items.pop_front() {
                state.counters.drained += 1;
                return Some(item);
            }
            if state.detector.is_quiescent() {
                return None;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Marks a popped item as fully processed, broadcasting when it was the last one
    pub fn complete(&self) {
        let mut state = self.lock();
        let finished = state.detector.complete();
        drop(state);
        if finished {
            self.available.notify_all();
        }
    }

    /// Stops handing out work and wakes every waiting worker
    pub fn abort(&self) {
        let mut state = self.lock();
        state.aborted = true;
        drop(state);
        self.available.notify_all();
    }

    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }

    pub fn outstanding(&self) -> usize {
        self.lock().detector.outstanding()
    }

    pub fn counters(&self) -> QueueCounters {
        self.lock().counters
    }
}

/// Completes a popped shared-queue item when dropped.
///
/// If the worker unwinds while holding an item the queue is aborted instead, so the other
/// workers stop waiting for work that will never be completed.
pub(crate) struct CompletionGuard<'a> {
    queue: &'a SharedQueue,
}

impl<'a> CompletionGuard<'a> {
    pub(crate) fn new(queue: &'a SharedQueue) -> Self {
        Self { queue }
    }
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.queue.abort();
        } else {
            self.queue.complete();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_local_queue_fifo_and_counters() {
        let mut queue = LocalQueue::new();
        queue.push(WorkItem::new("a"));
        queue.extend(vec![WorkItem::new("b"), WorkItem::new("c")]);
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.pop().unwrap().path(), Path::new("a"));
        assert_eq!(queue.pop().unwrap().path(), Path::new("b"));
        assert_eq!(queue.pop().unwrap().path(), Path::new("c"));
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());

        assert_eq!(
            queue.counters(),
            QueueCounters {
                enqueued: 3,
                drained: 3
            }
        );
    }

    #[test]
    fn test_deal_round_robin() {
        let mut queue = LocalQueue::new();
        for name in ["a", "b", "c", "d", "e"] {
            queue.push(WorkItem::new(name));
        }
        queue.pop();

        let (counters, mut parts) = queue.deal(3);
        assert_eq!(counters, QueueCounters { enqueued: 5, drained: 1 });
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 2);
        assert_eq!(parts[1].len(), 1);
        assert_eq!(parts[2].len(), 1);
        assert_eq!(parts[0].pop().unwrap().path(), Path::new("b"));
        assert_eq!(parts[0].pop().unwrap().path(), Path::new("e"));
        assert_eq!(parts[0].counters(), QueueCounters { enqueued: 0, drained: 2 });
    }

    #[test]
    fn test_deal_more_parts_than_items() {
        let mut queue = LocalQueue::new();
        queue.push(WorkItem::new("only"));

        let (_, parts) = queue.deal(4);
        assert_eq!(parts.iter().filter(|p| p.is_empty()).count(), 3);
    }

    #[test]
    fn test_shared_queue_returns_none_when_quiescent() {
        let queue = SharedQueue::seeded(WorkItem::new("root"));
        let root = queue.pop().unwrap();
        assert_eq!(root.path(), Path::new("root"));

        queue.push_batch(vec![WorkItem::new("root/a"), WorkItem::new("root/b")]);
        queue.complete();
        assert_eq!(queue.outstanding(), 2);

        assert!(queue.pop().is_some());
        queue.complete();
        assert!(queue.pop().is_some());
        queue.complete();

        assert!(queue.pop().is_none());
        assert_eq!(queue.outstanding(), 0);
        assert_eq!(
            queue.counters(),
            QueueCounters {
                enqueued: 3,
                drained: 3
            }
        );
    }

    #[test]
    fn test_waiting_worker_wakes_for_new_work() {
        let queue = Arc::new(SharedQueue::seeded(WorkItem::new("root")));
        let root = queue.pop().unwrap();

        // The queue is empty but root is outstanding, so this pop must wait
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let item = queue.pop();
                if item.is_some() {
                    queue.complete();
                }
                item
            })
        };

        queue.push(WorkItem::new(root.path().join("child")));
        queue.complete();

        let child = waiter.join().unwrap().unwrap();
        assert_eq!(child.path(), Path::new("root/child"));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_waiting_workers_wake_on_completion() {
        let queue = Arc::new(SharedQueue::seeded(WorkItem::new("root")));
        let _root = queue.pop().unwrap();

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.pop())
            })
            .collect();

        queue.complete();
        for waiter in waiters {
            assert!(waiter.join().unwrap().is_none());
        }
    }

    #[test]
    fn test_abort_wakes_waiters() {
        let queue = Arc::new(SharedQueue::seeded(WorkItem::new("root")));
        let _root = queue.pop().unwrap();

        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };

        queue.abort();
        assert!(waiter.join().unwrap().is_none());
        assert!(queue.is_aborted());
    }

    #[test]
    fn test_completion_guard_aborts_on_panic() {
        let queue = Arc::new(SharedQueue::seeded(WorkItem::new("root")));

        let worker = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let _item = queue.pop().unwrap();
                let _guard = CompletionGuard::new(&queue);
                panic!("worker failed");
            })
        };

        assert!(worker.join().is_err());
        assert!(queue.is_aborted());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let queue = SharedQueue::new();
        queue.push_batch(Vec::new());
        assert_eq!(queue.outstanding(), 0);
        assert_eq!(queue.counters(), QueueCounters::default());
        assert!(queue.pop().is_none());
    }
}
