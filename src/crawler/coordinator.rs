//! Crawl coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop, including:
//! - Restoring the frontier from the last checkpoint, or seeding it
//! - Opening the output sink in append or fresh mode
//! - Growing the worker pool and running one cycle at a time
//! - Checkpointing after every cycle and detecting termination

use crate::checkpoint::{CheckpointStore, CheckpointWriter};
use crate::config::Config;
use crate::crawler::dispatcher::Dispatcher;
use crate::crawler::pool::WorkerPool;
use crate::frontier::{Frontier, SharedFrontier};
use crate::images::{ImageMaterializer, ImageStore};
use crate::output::{open_sink, SharedSink, PRODUCT_FIELDS};
use crate::source::{build_http_client, HttpSourceFactory, PageSourceFactory};
use crate::state::PageState;
use crate::ShelfError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// The external collaborators a crawl drives
pub struct Collaborators {
    /// Opens one page source per worker
    pub sources: Arc<dyn PageSourceFactory>,

    /// Materializes product images
    pub images: Arc<dyn ImageMaterializer>,
}

/// Outcome of a crawl run
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub cycles: u64,
    pub processed: usize,
    pub queued: usize,
    pub products: u64,
    pub skipped: usize,

    /// Largest worker pool size reached
    pub peak_workers: usize,

    /// Whether the run started from a checkpoint
    pub resumed: bool,

    /// Whether the run stopped on request before the frontier was exhausted
    pub interrupted: bool,

    pub checkpoints_written: u64,

    /// Visit outcomes across all cycles
    pub outcomes: HashMap<PageState, u64>,

    pub duration: Duration,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    frontier: SharedFrontier,
    pool: WorkerPool,
    dispatcher: Dispatcher,
    sink: SharedSink,
    checkpoints: CheckpointWriter,
    resumed: bool,
    stop: Arc<AtomicBool>,
}

impl Coordinator {
    /// Creates a coordinator using HTTP page sources and the image store
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fresh` - Whether to discard the checkpoint and existing output
    /// * `config_hash` - Hash of the configuration file, stored in checkpoints
    pub fn new(config: Config, fresh: bool, config_hash: Option<String>) -> Result<Self, ShelfError> {
        let client = build_http_client(&config.fetcher)?;
        let collaborators = Collaborators {
            sources: Arc::new(HttpSourceFactory::new(client.clone())),
            images: Arc::new(ImageStore::new(client, &config.output.images_dir)?),
        };

        Self::with_collaborators(config, fresh, config_hash, collaborators)
    }

    /// Creates a coordinator around caller-supplied collaborators
    pub fn with_collaborators(
        config: Config,
        fresh: bool,
        config_hash: Option<String>,
        collaborators: Collaborators,
    ) -> Result<Self, ShelfError> {
        let crawler = &config.crawler;
        let store = CheckpointStore::new(&config.output.checkpoint_path);

        let checkpoint = if fresh {
            tracing::info!("Starting fresh crawl, discarding previous checkpoint");
            store.clear()?;
            None
        } else {
            store.load()
        };

        if let Some(checkpoint) = &checkpoint {
            if let (Some(saved), Some(current)) = (&checkpoint.config_hash, &config_hash) {
                if saved != current {
                    tracing::warn!(
                        "Configuration changed since the checkpoint was written ({} -> {})",
                        saved,
                        current
                    );
                }
            }
        }

        let resumed = checkpoint.is_some();
        let frontier = match checkpoint {
            Some(checkpoint) => {
                tracing::info!(
                    "Resuming from checkpoint saved at {}: {} processed, {} queued, {} products",
                    checkpoint.saved_at.to_rfc3339(),
                    checkpoint.frontier.processed.len(),
                    checkpoint.frontier.queued.len(),
                    checkpoint.frontier.products_count
                );
                Frontier::from_state(&crawler.seed_url, crawler.max_retries, checkpoint.frontier)?
            }
            None => {
                tracing::info!("No checkpoint found, seeding with {}", crawler.seed_url);
                let mut frontier = Frontier::new(&crawler.seed_url, crawler.max_retries)?;
                frontier.seed(&crawler.seed_url);
                frontier
            }
        };
        let frontier = SharedFrontier::new(frontier);

        let mut sink = open_sink(&config.output, resumed)?;
        if !resumed {
            sink.write_header(&PRODUCT_FIELDS)?;
        }
        let sink: SharedSink = Arc::new(Mutex::new(sink));

        let pool = WorkerPool::new(
            collaborators.sources,
            crawler.effective_max_workers(),
            crawler.increment_threshold as usize,
        )?;

        let dispatcher = Dispatcher::new(
            frontier.clone(),
            collaborators.images,
            sink.clone(),
            config.locators.clone(),
            crawler.max_scroll_rounds,
        );

        Ok(Self {
            frontier,
            pool,
            dispatcher,
            sink,
            checkpoints: CheckpointWriter::new(store, config_hash),
            resumed,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Returns a flag that stops the crawl after the current cycle when set
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Returns the frontier shared with the workers
    pub fn frontier(&self) -> &SharedFrontier {
        &self.frontier
    }

    /// Runs cycles until the frontier is exhausted or a stop is requested
    ///
    /// Each cycle grows the pool if warranted, gives every worker one URL,
    /// waits for all visits and then checkpoints the frontier. The crawl ends
    /// when every worker finds the frontier empty in the same cycle.
    pub async fn run(mut self) -> Result<CrawlSummary, ShelfError> {
        let start_time = Instant::now();
        let mut summary = CrawlSummary {
            resumed: self.resumed,
            peak_workers: self.pool.len(),
            ..CrawlSummary::default()
        };

        while !self.frontier.is_exhausted() {
            if self.stop.load(Ordering::SeqCst) {
                tracing::warn!("Stop requested, ending crawl after {} cycles", summary.cycles);
                summary.interrupted = true;
                break;
            }

            self.pool.maybe_grow(self.frontier.queued_len());
            summary.peak_workers = summary.peak_workers.max(self.pool.len());

            let report = self.pool.run_cycle(&self.frontier, &self.dispatcher).await;
            summary.cycles += 1;
            for (state, count) in &report.outcomes {
                *summary.outcomes.entry(*state).or_insert(0) += count;
            }

            self.checkpoints.schedule(self.frontier.snapshot()).await;

            tracing::info!(
                "Cycle {}: {} processed, {} queued, {} products, {} workers",
                summary.cycles,
                self.frontier.processed_len(),
                self.frontier.queued_len(),
                self.frontier.products_count(),
                self.pool.len()
            );

            if report.all_idle() {
                break;
            }
        }

        self.checkpoints.schedule(self.frontier.snapshot()).await;
        self.checkpoints.wait().await;
        self.pool.shutdown().await;

        {
            let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
            sink.flush_and_close()?;
        }

        summary.processed = self.frontier.processed_len();
        summary.queued = self.frontier.queued_len();
        summary.products = self.frontier.products_count();
        summary.skipped = self.frontier.skipped_len();
        summary.checkpoints_written = self.checkpoints.written();
        summary.duration = start_time.elapsed();

        tracing::info!(
            "Crawl finished in {:?}: {} cycles, {} processed, {} products, {} skipped",
            summary.duration,
            summary.cycles,
            summary.processed,
            summary.products,
            summary.skipped
        );

        Ok(summary)
    }
}
