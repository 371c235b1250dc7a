//! Shelf-Crawler: a resumable storefront crawler
//!
//! This crate crawls a single host, tells listing pages apart from product
//! detail pages, extracts product records from the latter and checkpoints the
//! crawl frontier after every cycle so an interrupted crawl can resume without
//! repeating finished work.

pub mod checkpoint;
pub mod config;
pub mod crawler;
pub mod frontier;
pub mod images;
pub mod output;
pub mod source;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Shelf-Crawler operations
#[derive(Debug, Error)]
pub enum ShelfError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] checkpoint::CheckpointError),

    #[error("Page source error: {0}")]
    Source(#[from] source::SourceError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Image error: {0}")]
    Image(#[from] images::ImageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Shelf-Crawler operations
pub type Result<T> = std::result::Result<T, ShelfError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator, CrawlSummary};
pub use frontier::{Frontier, FrontierState, SharedFrontier};
pub use output::Product;
pub use state::PageState;
pub use url::normalize_url;
