//! Output sink trait and the product record it consumes

use std::io;
use thiserror::Error;

/// Column names, in the order every sink writes them
pub const PRODUCT_FIELDS: [&str; 6] = [
    "image",
    "name",
    "weight",
    "category",
    "price",
    "short_description",
];

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Unexpected header: {0}")]
    Header(String),

    #[error("Output sink already closed")]
    Closed,
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// One extracted product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Stable reference returned by the image store
    pub image: String,
    pub name: String,
    pub weight: String,
    /// Category path, empty when uncategorized
    pub category: String,
    /// Price in the smallest currency unit
    pub price: i64,
    pub short_description: String,
}

impl Product {
    /// Field values in `PRODUCT_FIELDS` order
    pub fn values(&self) -> [String; 6] {
        [
            self.image.clone(),
            self.name.clone(),
            self.weight.clone(),
            self.category.clone(),
            self.price.to_string(),
            self.short_description.clone(),
        ]
    }
}

/// Destination for product records
///
/// `write_header` is called at most once, and only when the crawl did not
/// resume from a checkpoint.
pub trait OutputSink: Send {
    fn write_header(&mut self, fields: &[&str]) -> OutputResult<()>;

    /// Writes one record; it must be durable once this returns
    fn write_record(&mut self, product: &Product) -> OutputResult<()>;

    fn flush_and_close(&mut self) -> OutputResult<()>;
}
