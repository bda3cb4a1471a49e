/// This module defines the error types for treescout.
///
/// Only conditions that make forward progress impossible surface as `Err`. Per-path problems
/// met during a scan (a file that cannot be opened, a directory that cannot be listed, a line
/// longer than the scan buffer) are recovered where they happen and show up as counters on
/// [`EngineResult`](crate::results::EngineResult) instead:
///
/// ```rust,ignore
/// match search(&config) {
///     Ok(result) => println!("{} matches, {} unreadable", result.total_occurrences(), result.unreadable_paths()),
///     Err(SearchError::InvalidArgument(msg)) => eprintln!("bad arguments: {msg}"),
///     Err(e) => eprintln!("search failed: {e}"),
/// }
/// ```
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that abort a search run
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Failed to start worker {worker}: {source}")]
    ResourceExhausted {
        worker: usize,
        source: std::io::Error,
    },
    #[error("Worker {0} panicked")]
    WorkerPanicked(usize),
    #[error("Search cancelled")]
    Cancelled,
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Canonicalize the path and strip UNC prefixes so that
/// comparisons on Windows are consistent.
pub fn unify_path(original: &Path) -> PathBuf {
    let canonical = original
        .canonicalize()
        .unwrap_or_else(|_| original.to_path_buf());
    strip_unc_prefix(&canonical)
}

/// Strips the Windows UNC prefix (\\?\) from a path if present
fn strip_unc_prefix(p: &Path) -> PathBuf {
    let s = p.display().to_string();
    if let Some(stripped) = s.strip_prefix(r"\\?\") {
        PathBuf::from(stripped)
    } else {
        p.to_path_buf()
    }
}

impl SearchError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn resource_exhausted(worker: usize, source: std::io::Error) -> Self {
        Self::ResourceExhausted { worker, source }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether the error was raised before any filesystem work started
    pub fn is_fatal_before_start(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::ConfigError(_))
    }
}

impl From<config::ConfigError> for SearchError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}
