//! Statistics derived from the stored checkpoint
//!
//! This module backs `--stats`: it summarizes crawl progress without
//! touching the network.

use crate::checkpoint::{Checkpoint, CheckpointResult, CheckpointStore};
use chrono::{DateTime, Utc};

/// Crawl progress summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// When the checkpoint was written
    pub saved_at: DateTime<Utc>,

    pub processed: usize,
    pub queued: usize,
    pub products: u64,

    /// URLs given up on after exhausting their retries
    pub skipped: usize,

    /// URLs that failed at least once and are still eligible for retry
    pub pending_retries: usize,

    /// Categories with the number of detail pages attributed to each, largest first
    pub categories: Vec<(String, usize)>,

    pub config_hash: Option<String>,
}

impl CrawlStatistics {
    pub fn from_checkpoint(checkpoint: &Checkpoint) -> Self {
        let state = &checkpoint.frontier;

        let mut categories: Vec<_> = state
            .category_index
            .iter()
            .map(|(category, urls)| (category.clone(), urls.len()))
            .collect();
        categories.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            saved_at: checkpoint.saved_at,
            processed: state.processed.len(),
            queued: state.queued.len(),
            products: state.products_count,
            skipped: state.skipped.len(),
            pending_retries: state.retries.len(),
            categories,
            config_hash: checkpoint.config_hash.clone(),
        }
    }

    /// Returns true once nothing is left to visit
    pub fn is_complete(&self) -> bool {
        self.queued == 0
    }
}

/// Loads statistics from the checkpoint store
///
/// Returns `Ok(None)` when no checkpoint exists yet.
pub fn load_statistics(store: &CheckpointStore) -> CheckpointResult<Option<CrawlStatistics>> {
    Ok(store
        .try_load()?
        .map(|checkpoint| CrawlStatistics::from_checkpoint(&checkpoint)))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Checkpoint saved at: {}", stats.saved_at.to_rfc3339());
    if let Some(hash) = &stats.config_hash {
        println!("Config hash: {}", hash);
    }
    println!();

    println!("Overview:");
    println!("  Pages processed: {}", stats.processed);
    println!("  Pages queued: {}", stats.queued);
    println!("  Products extracted: {}", stats.products);
    println!("  Pages skipped: {}", stats.skipped);
    println!("  Pages awaiting retry: {}", stats.pending_retries);
    println!();

    if !stats.categories.is_empty() {
        println!("Categories ({}):", stats.categories.len());
        for (category, count) in &stats.categories {
            println!("  {}: {}", category, count);
        }
        println!();
    }

    let total = stats.processed + stats.queued;
    let progress = if total > 0 {
        (stats.processed as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Progress: {:.1}% ({} / {} known pages processed){}",
        progress,
        stats.processed,
        total,
        if stats.is_complete() { ", complete" } else { "" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontier::Frontier;
    use tempfile::TempDir;

    fn checkpoint() -> Checkpoint {
        let mut frontier = Frontier::new("https://example.com/", 3).unwrap();
        frontier.seed("https://example.com/");
        frontier.take();
        frontier.mark_processed("https://example.com/");
        for url in ["https://example.com/p1", "https://example.com/p2"] {
            frontier.enqueue(url);
            frontier.attribute_category("Home > Snacks", url);
        }
        frontier.enqueue("https://example.com/p3");
        frontier.attribute_category("Home > Drinks", "https://example.com/p3");
        frontier.record_product("https://example.com/p1");
        Checkpoint::new(frontier.snapshot(), Some("abc".to_string()))
    }

    #[test]
    fn test_statistics_from_checkpoint() {
        let stats = CrawlStatistics::from_checkpoint(&checkpoint());

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.products, 1);
        assert_eq!(
            stats.categories,
            vec![
                ("Home > Snacks".to_string(), 2),
                ("Home > Drinks".to_string(), 1)
            ]
        );
        assert!(!stats.is_complete());
    }

    #[test]
    fn test_load_statistics() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("ckpt.json"));
        assert!(load_statistics(&store).unwrap().is_none());

        store.save(&checkpoint()).unwrap();
        let stats = load_statistics(&store).unwrap().unwrap();
        assert_eq!(stats.config_hash.as_deref(), Some("abc"));
    }
}
