//! Crawler module for page dispatch, workers and orchestration
//!
//! This module contains the core crawling logic, including:
//! - Classifying pages and extracting products
//! - The adaptive worker pool
//! - Overall crawl coordination

mod coordinator;
mod dispatcher;
mod pool;

pub use coordinator::{Collaborators, Coordinator, CrawlSummary};
pub use dispatcher::{parse_price, Dispatcher, ExtractionError};
pub use pool::{should_grow, CycleReport, Worker, WorkerPool};

use crate::config::Config;
use crate::ShelfError;

/// Runs a complete crawl operation, resuming from a checkpoint if one exists
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed
/// * `Err(ShelfError)` - Crawl could not start or its output could not be closed
pub async fn crawl(config: Config) -> Result<CrawlSummary, ShelfError> {
    Coordinator::new(config, false, None)?.run().await
}
