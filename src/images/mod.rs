//! Product image materialization
//!
//! The dispatcher hands every product image URL to an `ImageMaterializer`
//! and stores whatever stable reference it returns in the product record.
//! `ImageStore` is the filesystem implementation: it downloads the image,
//! transcodes it to PNG and names the file after the product.

mod store;

pub use store::{slugify, ImageStore};

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while materializing an image
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Failed to download {url}: {message}")]
    Download { url: String, message: String },

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Refusing to write image outside the images directory: {0}")]
    UnsafeName(String),

    #[error("Image task failed: {0}")]
    Task(String),
}

/// Turns a remote image into a stable local reference
#[async_trait]
pub trait ImageMaterializer: Send + Sync {
    async fn materialize(&self, source_url: &str, suggested_name: &str)
        -> Result<String, ImageError>;
}
