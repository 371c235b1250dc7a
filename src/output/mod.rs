//! Output sinks for extracted products
//!
//! This module handles:
//! - The `OutputSink` contract and the `Product` record
//! - CSV and SQLite sinks
//! - Crawl statistics read back from the checkpoint

mod csv_output;
mod sqlite_output;
pub mod stats;
mod traits;

pub use csv_output::CsvSink;
pub use sqlite_output::SqliteSink;
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use traits::{OutputError, OutputResult, OutputSink, Product, PRODUCT_FIELDS};

use crate::config::{OutputConfig, OutputFormat};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Sink shared by every worker of a crawl
pub type SharedSink = Arc<Mutex<Box<dyn OutputSink>>>;

/// Opens the configured sink
///
/// When `resume` is set, existing output is kept and appended to; otherwise
/// it is truncated.
pub fn open_sink(config: &OutputConfig, resume: bool) -> OutputResult<Box<dyn OutputSink>> {
    let path = Path::new(&config.products_path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(match config.format {
        OutputFormat::Csv if resume => Box::new(CsvSink::append(path)?),
        OutputFormat::Csv => Box::new(CsvSink::create(path)?),
        OutputFormat::Sqlite => Box::new(SqliteSink::open(path, !resume)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_sink_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let config = OutputConfig {
            checkpoint_path: dir.path().join("ckpt.json").display().to_string(),
            products_path: dir.path().join("out/products.csv").display().to_string(),
            format: OutputFormat::Csv,
            images_dir: dir.path().join("images").display().to_string(),
        };

        let mut sink = open_sink(&config, false).unwrap();
        sink.write_header(&PRODUCT_FIELDS).unwrap();
        sink.flush_and_close().unwrap();

        let content = std::fs::read_to_string(&config.products_path).unwrap();
        assert!(content.starts_with("image,name,"));
    }
}
