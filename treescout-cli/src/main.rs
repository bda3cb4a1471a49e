use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use std::{num::NonZeroUsize, path::PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use treescout::{
    config::CliOverrides, EngineResult, ScanMode, SearchConfig, SearchEngine, SearchError,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Text to count inside every file under the root
    needle: String,

    /// Directory (or single file) to start from
    root: PathBuf,

    /// Number of worker threads (default: CPU cores)
    threads: Option<NonZeroUsize>,

    /// Load balancing mode (serial|static|dynamic); unknown names fall back to static
    mode: Option<String>,

    /// Configuration file to load on top of the global and local ones
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Longest line, in bytes, tokenized in one piece; longer lines are split
    #[arg(long)]
    max_line_length: Option<usize>,

    /// Log level when RUST_LOG is not set (trace|debug|info|warn|error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Also run a serial search and fail if the totals differ
    #[arg(long)]
    verify: bool,

    /// Print every scan counter, not just the totals
    #[arg(short, long)]
    stats: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        if let Some(search_error) = e.downcast_ref::<SearchError>() {
            if search_error.is_fatal_before_start() {
                eprintln!(
                    "{}",
                    "usage: treescout <needle> <root> [threads] [serial|static|dynamic]".yellow()
                );
            }
        }
        return Err(e);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let file_config = match &cli.config {
        Some(path) => SearchConfig::load_from(Some(path.as_path()))?,
        None => SearchConfig::load()?,
    };

    let config = file_config.merge_with_cli(CliOverrides {
        needle: Some(cli.needle),
        root_path: Some(cli.root),
        thread_count: cli.threads,
        mode: cli.mode,
        max_line_length: cli.max_line_length,
        log_level: cli.log_level,
    });

    init_logging(&config.log_level)?;
    debug!("Effective configuration: {:?}", config);

    let engine = SearchEngine::new(config.clone())?;
    let result = engine.run()?;

    if cli.verify {
        verify_against_serial(&config, &result)?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("failed to encode result")?;
        println!("{json}");
    } else {
        print_result(&config.needle, &result, cli.stats);
    }
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    Ok(())
}

/// Re-runs the search on one thread and compares the totals
fn verify_against_serial(config: &SearchConfig, parallel: &EngineResult) -> Result<()> {
    if parallel.mode == ScanMode::Serial {
        return Ok(());
    }

    let serial = SearchEngine::new(config.clone().with_mode(ScanMode::Serial.as_str()))?.run()?;
    if serial.total_occurrences() != parallel.total_occurrences()
        || serial.unreadable_paths() != parallel.unreadable_paths()
    {
        bail!(
            "{} run found {} occurrences ({} unreadable) but serial found {} ({} unreadable)",
            parallel.mode,
            parallel.total_occurrences(),
            parallel.unreadable_paths(),
            serial.total_occurrences(),
            serial.unreadable_paths()
        );
    }

    eprintln!(
        "{} serial and {} runs agree",
        "verified:".green(),
        parallel.mode
    );
    Ok(())
}

fn print_result(needle: &str, result: &EngineResult, stats: bool) {
    if let Some(requested) = &result.fallback_from {
        eprintln!(
            "{} unknown load balancing option '{}', used static load balancing",
            "warning:".yellow(),
            requested
        );
    }

    println!(
        "The string {} was found {} times within the file system.",
        needle.blue(),
        result.total_occurrences().to_string().green()
    );
    if result.unreadable_paths() > 0 {
        println!(
            "{} paths could not be read",
            result.unreadable_paths().to_string().red()
        );
    }

    if stats {
        let m = &result.metrics;
        println!("\nMode: {} ({} threads)", result.mode, result.threads);
        println!("Files searched: {}", m.files_searched);
        println!("Directories expanded: {}", m.directories_expanded);
        println!("Skipped entries: {}", m.skipped_entries);
        println!("Oversized lines: {}", m.oversized_lines);
        println!("Items enqueued/drained: {}/{}", m.items_enqueued, m.items_drained);
    }
}
