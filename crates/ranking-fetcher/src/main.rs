//! Ranking fetcher CLI application.

use anyhow::{bail, Context, Result};
use clap::Parser;
use ranking_fetcher::{
    Backoff, FetchMode, PacingController, RankingClient, RankingDriver, RetryPolicy, RunOptions,
};
use shared::{Config, DataPaths, RunMode};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// First page to fetch (requires --end-page; skips discovery)
    #[arg(long)]
    start_page: Option<u32>,

    /// Last page to fetch (requires --start-page)
    #[arg(long)]
    end_page: Option<u32>,

    /// Output file path (single-file modes only)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fetch with a worker pool of this width
    #[arg(short = 'w', long, conflicts_with = "parts")]
    workers: Option<usize>,

    /// Split the run into this many part files
    #[arg(long)]
    parts: Option<u32>,

    /// Sort worker-pool output by page number before writing
    #[arg(long)]
    sort_output: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    config.validate().context("Invalid configuration")?;

    // Initialize logging
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    shared::logging::init(shared::LogConfig {
        log_dir: config.log_dir().to_string_lossy().to_string(),
        component: "ranking-fetcher".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!("Ranking fetcher starting");
    info!(config_file = %args.config.display(), "Loaded configuration");

    let page_range = match (args.start_page, args.end_page) {
        (Some(start), Some(end)) => Some((start, end)),
        (None, None) => None,
        _ => bail!("--start-page and --end-page must be given together"),
    };

    let mode = resolve_mode(&args, &config);
    info!(?mode, ?page_range, "Runtime configuration");

    // Initialize data paths
    let data_paths = DataPaths::new(config.data_dir());
    data_paths
        .create_dirs()
        .context("Failed to create data directories")?;

    // Worker-pool mode swaps the paced linear backoff for a capped
    // exponential one; the pool width takes over global pacing.
    let retry = RetryPolicy {
        max_attempts: config.fetcher.max_retries,
        backoff: match mode {
            FetchMode::Concurrent { .. } => Backoff::Exponential {
                base: Duration::from_millis(config.fetcher.retry_base_delay_ms),
                max: Duration::from_millis(config.fetcher.retry_max_delay_ms),
            },
            _ => Backoff::Linear {
                base: Duration::from_millis(config.fetcher.retry_base_delay_ms),
            },
        },
    };

    let client =
        RankingClient::new(&config.fetcher, retry).context("Failed to create ranking client")?;

    let pacing = PacingController::new(
        Duration::from_millis(config.fetcher.pacing.base_delay_ms),
        Duration::from_millis(config.fetcher.pacing.min_delay_ms),
        Duration::from_millis(config.fetcher.pacing.max_delay_ms),
    );

    let mut driver = RankingDriver::new(
        client,
        pacing,
        data_paths,
        RunOptions {
            mode,
            page_range,
            output: args.output.clone(),
            sort_output: args.sort_output || config.fetcher.sort_output,
        },
    )?;

    let stats = driver.run().await.context("Fetch run failed")?;

    // Display final statistics
    info!("=== Fetch Complete ===");
    info!("Pages in range: {}", stats.total_pages);
    info!("Pages fetched: {}", stats.pages_fetched);
    info!("Pages missing (404): {}", stats.pages_missing);
    info!("Pages failed: {}", stats.pages_failed);
    info!("Records written: {}", stats.records_written);

    info!("Ranking fetcher finished successfully");

    Ok(())
}

/// Pick the run mode from CLI flags, falling back to the config file
fn resolve_mode(args: &Args, config: &Config) -> FetchMode {
    if let Some(workers) = args.workers {
        return FetchMode::Concurrent { workers };
    }
    if let Some(parts) = args.parts {
        return FetchMode::Partitioned { parts };
    }

    match config.fetcher.mode {
        RunMode::Sequential => FetchMode::Sequential,
        RunMode::Partitioned => FetchMode::Partitioned {
            parts: config.fetcher.parts,
        },
        RunMode::Concurrent => FetchMode::Concurrent {
            workers: config.fetcher.workers,
        },
    }
}
