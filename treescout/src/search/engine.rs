use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::dynamic::DynamicScheduler;
use super::matcher::NeedleMatcher;
use super::processor::FileProcessor;
use super::queue::{QueueCounters, WorkItem};
use super::static_partition::StaticPartitioner;
use super::worker::{run_serial, WorkerContext};
use crate::config::SearchConfig;
use crate::errors::{unify_path, SearchError, SearchResult};
use crate::results::EngineResult;

/// Load-balancing discipline for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Everything on the calling thread; the reference result for the other modes
    Serial,
    /// Work split up front, no sharing afterwards
    Static,
    /// Work pulled from one shared queue
    Dynamic,
}

impl ScanMode {
    /// Resolves a mode name, falling back to [`ScanMode::Static`] for unknown names
    pub fn resolve(name: &str) -> ModeSelection {
        match name.parse() {
            Ok(mode) => ModeSelection {
                mode,
                fallback_from: None,
            },
            Err(_) => ModeSelection {
                mode: ScanMode::Static,
                fallback_from: Some(name.to_string()),
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Serial => "serial",
            ScanMode::Static => "static",
            ScanMode::Dynamic => "dynamic",
        }
    }
}

impl FromStr for ScanMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(ScanMode::Serial),
            "static" => Ok(ScanMode::Static),
            "dynamic" => Ok(ScanMode::Dynamic),
            other => Err(SearchError::invalid_argument(format!(
                "unknown load balancing mode: {other}"
            ))),
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mode a run will use, and the unrecognized name it replaced if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSelection {
    pub mode: ScanMode,
    pub fallback_from: Option<String>,
}

/// Cooperative cancellation flag shared between a caller and a running engine.
///
/// Workers check the flag before taking each item, so an abort takes effect after the
/// items currently being processed finish.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Runs one search from a validated configuration
#[derive(Debug)]
pub struct SearchEngine {
    config: SearchConfig,
    abort: AbortHandle,
}

impl SearchEngine {
    /// Validates `config` and builds an engine for it
    pub fn new(config: SearchConfig) -> SearchResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            abort: AbortHandle::new(),
        })
    }

    /// Replaces the engine's abort handle with one the caller already holds
    pub fn with_abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    /// Returns a handle that cancels this engine's runs
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Scans the tree under the configured root and counts needle occurrences
    pub fn run(&self) -> SearchResult<EngineResult> {
        let selection = ScanMode::resolve(&self.config.mode);
        if let Some(requested) = &selection.fallback_from {
            warn!(
                "Unknown load balancing option '{}' provided, defaulting to static load balancing",
                requested
            );
        }

        let threads = match selection.mode {
            ScanMode::Serial => 1,
            ScanMode::Static | ScanMode::Dynamic => self.config.thread_count.get(),
        };
        info!(
            "Starting {} search for '{}' under {} with {} thread(s)",
            selection.mode,
            self.config.needle,
            unify_path(&self.config.root_path).display(),
            threads
        );

        let processor = FileProcessor::new(
            NeedleMatcher::new(&self.config.needle),
            self.config.max_line_length,
        );
        let ctx = WorkerContext::new(&processor, &self.abort);
        let root = WorkItem::new(&self.config.root_path);

        let (workers, shared_queue) = match selection.mode {
            ScanMode::Serial => (vec![run_serial(ctx, root)?], QueueCounters::default()),
            ScanMode::Static => (
                StaticPartitioner::new(threads).run(ctx, root)?,
                QueueCounters::default(),
            ),
            ScanMode::Dynamic => {
                let run = DynamicScheduler::new(threads).run(ctx, root)?;
                (run.workers, run.queue)
            }
        };
        debug!("Aggregating results from {} workers", workers.len());

        let result = EngineResult::aggregate(&workers, shared_queue, selection, threads);
        result.metrics.log_stats();
        info!(
            "Search complete. Found {} occurrences in {} files ({} unreadable paths)",
            result.total_occurrences(),
            result.metrics.files_searched,
            result.unreadable_paths()
        );
        Ok(result)
    }
}

/// Validates `config` and runs a single search with it
pub fn search(config: &SearchConfig) -> SearchResult<EngineResult> {
    SearchEngine::new(config.clone())?.run()
}
