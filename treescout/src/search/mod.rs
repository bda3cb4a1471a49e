/// Concurrent content search over a directory tree.
///
/// A run starts from one root path and ends with a single occurrence count. Every path met
/// on the way becomes a [`WorkItem`](queue::WorkItem); directories expand into more items and
/// regular files are read line by line and tokenized. How items reach threads depends on the
/// mode:
///
/// - **serial**: one private queue on the calling thread. This is the reference result.
/// - **static**: the tree is expanded breadth-first until there is an item per thread, the
///   frontier is dealt round-robin into private queues, and each thread drains its own.
/// - **dynamic**: all threads pull from one [`SharedQueue`](queue::SharedQueue) and push
///   children back onto it. The run ends when no item is queued or in flight.
///
/// ```rust,ignore
/// let config = SearchConfig::new("cat", "/srv/data").with_mode("dynamic");
/// let result = search(&config)?;
/// println!("{} occurrences", result.total_occurrences());
/// ```
///
/// The total does not depend on the mode or on the thread count. Symlinks are never
/// followed, so cycles cannot make a run loop forever.
pub mod classifier;
pub mod dynamic;
pub mod engine;
pub mod matcher;
pub mod processor;
pub mod queue;
pub mod static_partition;
pub mod termination;
pub mod worker;

pub use engine::{search, AbortHandle, ModeSelection, ScanMode, SearchEngine};
pub use matcher::NeedleMatcher;
pub use processor::FileProcessor;
