//! Shelf-Crawler main entry point
//!
//! This is the command-line interface for the resumable storefront crawler.

use anyhow::Context;
use clap::Parser;
use shelf_crawler::checkpoint::CheckpointStore;
use shelf_crawler::config::{load_config_with_hash, Config};
use shelf_crawler::output::{load_statistics, print_statistics};
use shelf_crawler::Coordinator;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing_subscriber::EnvFilter;

/// Shelf-Crawler: a resumable storefront crawler
///
/// Shelf-Crawler walks every page under a seed URL, harvests links from
/// listing pages, extracts product records from detail pages and checkpoints
/// its progress after every cycle so an interrupted crawl can resume.
#[derive(Parser, Debug)]
#[command(name = "shelf-crawler")]
#[command(version)]
#[command(about = "A resumable storefront crawler", long_about = None)]
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

    /// Start a fresh crawl, discarding the checkpoint and existing output
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "fresh"])]
    dry_run: bool,

    /// Show statistics from the checkpoint and exit
    #[arg(long, conflicts_with_all = ["dry_run", "fresh"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelf_crawler=info,warn"),
            1 => EnvFilter::new("shelf_crawler=debug,info"),
            2 => EnvFilter::new("shelf_crawler=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Shelf-Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed URL: {}", config.crawler.seed_url);
    println!(
        "  Max workers: {}",
        config.crawler.effective_max_workers()
    );
    println!(
        "  Increment threshold: {}",
        config.crawler.increment_threshold
    );
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Max scroll rounds: {}", config.crawler.max_scroll_rounds);

    println!("\nFetcher:");
    println!("  User agent: {}", config.fetcher.user_agent);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);

    println!("\nLocators:");
    println!("  Detail marker: {}", config.locators.detail_marker);
    println!("  Breadcrumb: {}", config.locators.breadcrumb);
    println!("  Links: {}", config.locators.links);

    println!("\nOutput:");
    println!("  Checkpoint: {}", config.output.checkpoint_path);
    println!(
        "  Products: {} ({:?})",
        config.output.products_path, config.output.format
    );
    println!("  Images: {}", config.output.images_dir);

    let store = CheckpointStore::new(&config.output.checkpoint_path);
    println!("\n✓ Configuration is valid");
    if store.path().exists() {
        println!("✓ Would resume from {}", store.path().display());
    } else {
        println!("✓ Would start crawling at {}", config.crawler.seed_url);
    }
}

/// Handles the --stats mode: shows statistics from the checkpoint
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store = CheckpointStore::new(&config.output.checkpoint_path);
    println!("Checkpoint: {}\n", store.path().display());

    match load_statistics(&store).context("Failed to read checkpoint")? {
        Some(stats) => print_statistics(&stats),
        None => println!("No checkpoint yet; nothing has been crawled."),
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String, fresh: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} with up to {} workers",
        config.crawler.seed_url,
        config.crawler.effective_max_workers()
    );

    let coordinator = Coordinator::new(config, fresh, Some(config_hash))
        .context("Failed to start crawl")?;

    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing the current cycle");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let summary = coordinator.run().await.context("Crawl failed")?;

    if summary.interrupted {
        tracing::info!(
            "Crawl interrupted after {} cycles; rerun to resume",
            summary.cycles
        );
    } else {
        tracing::info!("Crawl completed successfully");
    }
    println!(
        "{} products, {} pages processed, {} skipped, {} still queued",
        summary.products, summary.processed, summary.skipped, summary.queued
    );

    Ok(())
}
