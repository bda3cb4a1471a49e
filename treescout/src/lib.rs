pub mod config;
pub mod errors;
pub mod metrics;
pub mod results;
pub mod search;

pub use config::SearchConfig;
pub use errors::{SearchError, SearchResult};
pub use metrics::ScanMetrics;
pub use results::EngineResult;
pub use search::{search, AbortHandle, ScanMode, SearchEngine};
