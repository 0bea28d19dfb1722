//! dir-harvest main entry point
//!
//! This is the command-line interface for the dir-harvest directory crawler.

use anyhow::Context;
use clap::Parser;
use dir_harvest::config::{load_config_with_hash, Config};
use dir_harvest::crawler::run_harvest;
use dir_harvest::storage::CheckpointStore;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// dir-harvest: a resumable directory crawler
///
/// dir-harvest walks a business directory batch by batch through a rotating
/// pool of proxies and appends one CSV row per company. Completed batches
/// are checkpointed, so an interrupted run resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "dir-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable directory crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Forget completed batches and start over
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long, conflicts_with_all = ["stats", "dedup"])]
    dry_run: bool,

    /// Show statistics from the result file and exit
    #[arg(long, conflicts_with_all = ["dry_run", "dedup"])]
    stats: bool,

    /// Write a copy of the result file with one row per source URL and exit
    #[arg(long, value_name = "OUTPUT", conflicts_with_all = ["dry_run", "stats"])]
    dedup: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(output) = &cli.dedup {
        handle_dedup(&config, output)?;
    } else {
        handle_harvest(&config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("dir_harvest=info,warn"),
            1 => EnvFilter::new("dir_harvest=debug,info"),
            2 => EnvFilter::new("dir_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let checkpoint = CheckpointStore::new(&config.output.checkpoint_path);
    let completed = checkpoint.load()?;

    println!("=== dir-harvest Dry Run ===\n");

    println!("Site:");
    println!("  Directory: {}", config.site.directory_url());
    println!("  Page parameter: {}", config.site.page_param);
    println!("  User agent: {}", config.site.user_agent);

    println!("\nCrawler Configuration:");
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Save every: {} batches", config.crawler.save_every);
    println!("  Fetch attempts: {}", config.crawler.fetch_attempts);
    println!("  Page attempts: {}", config.crawler.page_attempts);
    println!("  Detail attempts: {}", config.crawler.detail_attempts);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!(
        "  Refetch listing pages: {}",
        config.crawler.refetch_listing_pages
    );
    println!(
        "  Batch pause: {}-{}ms",
        config.crawler.batch_pause.min_ms, config.crawler.batch_pause.max_ms
    );

    println!("\nProxy Pool:");
    println!("  Source: {}", config.proxy.source_url);
    println!("  Refresh interval: {}s", config.proxy.refresh_interval_secs);
    println!("  Eviction threshold: {}", config.proxy.eviction_threshold);

    println!("\nOutput:");
    println!("  Checkpoint: {}", config.output.checkpoint_path);
    println!("  Results: {}", config.output.results_path);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ {} batches already completed and would be skipped",
        completed.len()
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the result file
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use dir_harvest::output::{load_statistics, print_statistics};

    println!("Results: {}\n", config.output.results_path);

    let completed = CheckpointStore::new(&config.output.checkpoint_path).load()?;
    let stats = load_statistics(Path::new(&config.output.results_path))?;

    print_statistics(&stats, completed.len());

    Ok(())
}

/// Handles the --dedup mode: writes a deduplicated copy of the result file
fn handle_dedup(config: &Config, output: &Path) -> anyhow::Result<()> {
    use dir_harvest::output::deduplicate;

    println!("=== Deduplicating Results ===\n");
    println!("Input: {}", config.output.results_path);
    println!("Output: {}", output.display());
    println!();

    let kept = deduplicate(Path::new(&config.output.results_path), output)?;

    println!("✓ Wrote {} unique rows to: {}", kept, output.display());

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh harvest (clearing the checkpoint)");
        CheckpointStore::new(&config.output.checkpoint_path).clear()?;
    } else {
        tracing::info!("Starting harvest (completed batches will be skipped)");
    }

    match run_harvest(config).await {
        Ok(summary) => {
            tracing::info!(
                "Harvest completed successfully: {} batches processed, {} skipped, {} rows written",
                summary.batches_processed,
                summary.batches_skipped,
                summary.rows_written
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
