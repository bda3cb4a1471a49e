use serde::Serialize;
use std::ops::AddAssign;
use tracing::info;

/// Counters collected by a single worker while it scans.
///
/// Each worker owns its `ScanMetrics` outright and nothing else writes to it, so the fields
/// are plain integers. The aggregator merges them only after the owning thread has been
/// joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanMetrics {
    /// Needle occurrences found in files this worker searched
    pub occurrences: u64,
    /// Paths that could not be stat'ed, listed or opened
    pub unreadable_paths: u64,
    /// Regular files fully searched
    pub files_searched: u64,
    /// Directories whose children were enqueued
    pub directories_expanded: u64,
    /// Symlinks and other non-regular entries
    pub skipped_entries: u64,
    /// Lines longer than the scan buffer
    pub oversized_lines: u64,
    /// Work items pushed to a private queue
    pub items_enqueued: u64,
    /// Work items popped from a private queue
    pub items_drained: u64,
}

impl ScanMetrics {
    /// Creates a zeroed set of counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a searched file and its per-file outcome
    pub fn record_file(&mut self, occurrences: u64, oversized_lines: u64) {
        self.files_searched += 1;
        self.occurrences += occurrences;
        self.oversized_lines += oversized_lines;
    }

    /// Records a path that could not be read
    pub fn record_unreadable(&mut self) {
        self.unreadable_paths += 1;
    }

    /// Records a directory expansion
    pub fn record_directory(&mut self) {
        self.directories_expanded += 1;
    }

    /// Records a skipped symlink or special file
    pub fn record_skipped(&mut self) {
        self.skipped_entries += 1;
    }

    /// Merges another worker's counters into this one
    pub fn merge(&mut self, other: &ScanMetrics) {
        self.occurrences += other.occurrences;
        self.unreadable_paths += other.unreadable_paths;
        self.files_searched += other.files_searched;
        self.directories_expanded += other.directories_expanded;
        self.skipped_entries += other.skipped_entries;
        self.oversized_lines += other.oversized_lines;
        self.items_enqueued += other.items_enqueued;
        self.items_drained += other.items_drained;
    }

    /// Logs the counters
    pub fn log_stats(&self) {
        info!(
            "Scan stats:\n\
             Occurrences: {}\n\
             Files searched: {}\n\
             Directories expanded: {}\n\
             Skipped entries: {}\n\
             Unreadable paths: {}\n\
             Oversized lines: {}\n\
             Items enqueued/drained: {}/{}",
            self.occurrences,
            self.files_searched,
            self.directories_expanded,
            self.skipped_entries,
            self.unreadable_paths,
            self.oversized_lines,
            self.items_enqueued,
            self.items_drained
        );
    }
}

impl AddAssign<&ScanMetrics> for ScanMetrics {
    fn add_assign(&mut self, other: &ScanMetrics) {
        self.merge(other);
    }
}
