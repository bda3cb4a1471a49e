use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{SearchError, SearchResult};

/// Configuration for a search run.
///
/// The engine receives one immutable `SearchConfig` and never consults any other state; every
/// worker reads what it needs from the configuration it was handed.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.treescout.yaml` in the current directory
/// 3. Global `$HOME/.config/treescout/config.yaml`
///
/// # Configuration Format
///
/// ```yaml
/// # Text to count (plain substring, matched inside tokens)
/// needle: "cat"
///
/// # Root directory to scan
/// root_path: "."
///
/// # Worker threads (default: CPU cores)
/// thread_count: 4
///
/// # serial, static or dynamic; anything else falls back to static
/// mode: "dynamic"
///
/// # Longest line, in bytes, tokenized in one piece
/// max_line_length: 8192
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
///
/// When using the CLI, command-line arguments take precedence over config file values.
/// The merging behavior is defined in the `merge_with_cli` method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// The text to search for
    #[serde(default)]
    pub needle: String,

    /// Root directory to start the scan from
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Number of worker threads
    /// Defaults to number of CPU cores if not specified
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Load-balancing mode name (serial, static, dynamic)
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Lines longer than this many bytes are tokenized in chunks of this size
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Values given on the command line; `None` means the argument was not given
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub needle: Option<String>,
    pub root_path: Option<PathBuf>,
    pub thread_count: Option<NonZeroUsize>,
    pub mode: Option<String>,
    pub max_line_length: Option<usize>,
    pub log_level: Option<String>,
}

pub const DEFAULT_MAX_LINE_LENGTH: usize = 8192;

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

pub fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_mode() -> String {
    "static".to_string()
}

fn default_max_line_length() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            needle: String::new(),
            root_path: default_root_path(),
            thread_count: default_thread_count(),
            mode: default_mode(),
            max_line_length: default_max_line_length(),
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Creates a configuration for `needle` under `root_path` with defaults elsewhere
    pub fn new(needle: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
        Self {
            needle: needle.into(),
            root_path: root_path.into(),
            ..Self::default()
        }
    }

    pub fn with_threads(mut self, thread_count: NonZeroUsize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from a specific file
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("treescout/config.yaml")),
            Some(PathBuf::from(".treescout.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicitly requested file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Merges CLI arguments with configuration file values.
    ///
    /// Every argument the user gave replaces the file value, even when it equals the default.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(needle) = cli.needle {
            self.needle = needle;
        }
        if let Some(root_path) = cli.root_path {
            self.root_path = root_path;
        }
        if let Some(thread_count) = cli.thread_count {
            self.thread_count = thread_count;
        }
        if let Some(mode) = cli.mode {
            self.mode = mode;
        }
        if let Some(max_line_length) = cli.max_line_length {
            self.max_line_length = max_line_length;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Rejects configurations that cannot start a run
    pub fn validate(&self) -> SearchResult<()> {
        if self.needle.is_empty() {
            return Err(SearchError::invalid_argument("needle must not be empty"));
        }
        if self.root_path.as_os_str().is_empty() {
            return Err(SearchError::invalid_argument("root path must not be empty"));
        }
        if self.max_line_length == 0 {
            return Err(SearchError::invalid_argument(
                "max line length must be at least 1 byte",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let config_content = r#"
            needle: "cat"
            root_path: "src"
            thread_count: 4
            mode: "dynamic"
            max_line_length: 512
            log_level: "debug"
        "#;

        let mut file = File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.needle, "cat");
        assert_eq!(config.root_path, PathBuf::from("src"));
        assert_eq!(config.thread_count, NonZeroUsize::new(4).unwrap());
        assert_eq!(config.mode, "dynamic");
        assert_eq!(config.max_line_length, 512);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_merge_with_cli() {
        let config_file = SearchConfig {
            needle: "dog".to_string(),
            root_path: PathBuf::from("src"),
            thread_count: NonZeroUsize::new(4).unwrap(),
            mode: "static".to_string(),
            max_line_length: 1024,
            log_level: "warn".to_string(),
        };

        let cli = CliOverrides {
            needle: Some("cat".to_string()),
            root_path: None,
            thread_count: Some(NonZeroUsize::new(8).unwrap()),
            mode: None,
            max_line_length: None,
            log_level: Some("debug".to_string()),
        };

        let merged = config_file.merge_with_cli(cli);
        assert_eq!(merged.needle, "cat"); // CLI value
        assert_eq!(merged.root_path, PathBuf::from("src")); // File value (not given)
        assert_eq!(merged.thread_count, NonZeroUsize::new(8).unwrap()); // CLI value
        assert_eq!(merged.mode, "static"); // File value (not given)
        assert_eq!(merged.max_line_length, 1024); // File value (not given)
        assert_eq!(merged.log_level, "debug"); // CLI value
    }

    #[test]
    fn test_explicit_cli_defaults_override_file() {
        let config_file = SearchConfig {
            needle: "dog".to_string(),
            root_path: PathBuf::from("sub"),
            thread_count: NonZeroUsize::new(4).unwrap(),
            mode: "dynamic".to_string(),
            max_line_length: 2,
            log_level: "debug".to_string(),
        };

        let cli = CliOverrides {
            needle: Some(String::new()),
            root_path: Some(PathBuf::from(".")),
            max_line_length: Some(DEFAULT_MAX_LINE_LENGTH),
            log_level: Some("warn".to_string()),
            ..CliOverrides::default()
        };

        let merged = config_file.merge_with_cli(cli);
        assert_eq!(merged.root_path, PathBuf::from("."));
        assert_eq!(merged.max_line_length, DEFAULT_MAX_LINE_LENGTH);
        assert_eq!(merged.log_level, "warn");
        assert_eq!(merged.mode, "dynamic");
        // An empty needle from the command line is kept and then rejected
        assert!(merged.needle.is_empty());
        assert!(matches!(
            merged.validate(),
            Err(SearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_default_values() {
        let config_content = r#"
            needle: "test"
        "#;

        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.needle, "test");
        assert_eq!(config.root_path, PathBuf::from("."));
        assert_eq!(config.mode, "static");
        assert_eq!(config.max_line_length, DEFAULT_MAX_LINE_LENGTH);
        assert_eq!(config.thread_count, default_thread_count());
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_invalid_config() {
        let config_content = r#"
            needle: []  # Should be string
            thread_count: "invalid"  # Should be number
        "#;

        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let result = SearchConfig::load_from(Some(&config_path));
        assert!(matches!(result, Err(SearchError::ConfigError(_))));
    }

    #[test]
    fn test_zero_threads_rejected_by_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, "needle: \"x\"\nthread_count: 0\n").unwrap();

        assert!(SearchConfig::load_from(Some(&config_path)).is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = SearchConfig::load_from(Some(Path::new("nonexistent.yaml")));
        assert!(matches!(result, Err(SearchError::ConfigError(_))));
    }

    #[test]
    fn test_validate() {
        assert!(SearchConfig::new("cat", ".").validate().is_ok());

        let err = SearchConfig::new("", ".").validate().unwrap_err();
        assert!(matches!(err, SearchError::InvalidArgument(_)));

        let err = SearchConfig::new("cat", "").validate().unwrap_err();
        assert!(matches!(err, SearchError::InvalidArgument(_)));

        let err = SearchConfig::new("cat", ".")
            .with_max_line_length(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidArgument(_)));
    }
}
