/// Tracks outstanding work for the shared queue.
///
/// An item is outstanding from the moment it is pushed until the worker that popped it has
/// finished with it, including pushing any children it produced. Children are registered
/// before their parent completes, so the count only reaches zero once no item is queued and
/// no worker can produce more.
///
/// The detector holds no lock of its own; it lives inside the shared queue's mutex and every
/// method is called with that lock held.
#[derive(Debug, Default)]
pub struct TerminationDetector {
    outstanding: usize,
}

impl TerminationDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `count` newly pushed items
    pub fn register(&mut self, count: usize) {
        self.outstanding += count;
    }

    /// Marks one item as fully processed. Returns true when this was the last one.
    pub fn complete(&mut self) -> bool {
        debug_assert!(self.outstanding > 0, "completed more items than registered");
        self.outstanding = self.outstanding.saturating_sub(1);
        self.outstanding == 0
    }

    /// Items pushed but not yet completed
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// True once every registered item has completed
    pub fn is_quiescent(&self) -> bool {
        self.outstanding == 0
    }
}
