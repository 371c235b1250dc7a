use serde::Deserialize;

/// Main configuration structure for Shelf-Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub locators: Locators,
    pub output: OutputConfig,
}

/// Crawl frontier and worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Root URL of the storefront; also the host prefix every URL must share
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Upper bound on concurrent workers (values below 1 are treated as 1)
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: u32,

    /// Queued URLs required per existing worker before the pool grows
    #[serde(rename = "increment-threshold", default = "default_increment_threshold")]
    pub increment_threshold: u32,

    /// Failed detail extractions tolerated before a URL is skipped for good
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Cap on viewport-extend rounds when revealing a listing page
    #[serde(rename = "max-scroll-rounds", default = "default_max_scroll_rounds")]
    pub max_scroll_rounds: u32,
}

impl CrawlerConfig {
    /// Returns the configured worker limit clamped to at least one worker
    pub fn effective_max_workers(&self) -> usize {
        self.max_workers.max(1) as usize
    }
}

/// HTTP page source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// User agent sent with every page and image request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Element locators for the listing/detail page layout
///
/// Locators are handed to the page source untouched; the bundled HTTP page
/// source reads them as CSS selectors.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Locators {
    /// Present only on product detail pages
    #[serde(rename = "detail-marker")]
    pub detail_marker: String,

    /// Product image (its `src` attribute is used)
    pub image: String,

    /// Product name
    pub title: String,

    /// Weight or unit label
    pub weight: String,

    /// Usual price location
    #[serde(rename = "price-primary")]
    pub price_primary: String,

    /// Fallback price location, read when the primary one yields nothing
    #[serde(rename = "price-secondary")]
    pub price_secondary: String,

    /// Optional short description
    pub description: String,

    /// Breadcrumb items on listing pages
    pub breadcrumb: String,

    /// Link elements to harvest on listing pages
    pub links: String,
}

impl Default for Locators {
    fn default() -> Self {
        Self {
            detail_marker: "article.product-detail img.product-image".to_string(),
            image: "article.product-detail img.product-image".to_string(),
            title: "article.product-detail h1".to_string(),
            weight: "article.product-detail .product-weight".to_string(),
            price_primary: "article.product-detail .discounted-price span".to_string(),
            price_secondary: "article.product-detail .price span".to_string(),
            description: "article.product-detail .product-description p".to_string(),
            breadcrumb: "ol.breadcrumb li".to_string(),
            links: "a[href]".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the JSON checkpoint file
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Path to the product table (CSV file or SQLite database)
    #[serde(rename = "products-path")]
    pub products_path: String,

    /// Format of the product table
    #[serde(default)]
    pub format: OutputFormat,

    /// Directory receiving materialized product images
    #[serde(rename = "images-dir")]
    pub images_dir: String,
}

/// Product table format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Sqlite,
}

fn default_max_workers() -> u32 {
    1
}

fn default_increment_threshold() -> u32 {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_scroll_rounds() -> u32 {
    50
}

fn default_user_agent() -> String {
    format!("shelf-crawler/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}
