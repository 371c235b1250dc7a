//! Page sources
//!
//! A page source is one rendering session: it loads a URL, answers element
//! queries against the loaded page and evaluates the small scripts used to
//! reveal lazily loaded content. Each worker owns exactly one source for its
//! whole lifetime.
//!
//! This module defines the contract plus an HTTP implementation that fetches
//! pages with `reqwest` and queries them with `scraper` CSS selectors.

mod dom;
mod fetcher;
mod http;

pub use dom::{query_all, query_first};
pub use fetcher::{build_http_client, fetch_page, FetchedPage};
pub use http::{HttpPageSource, HttpSourceFactory};

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Script returning the current document height
pub const SCROLL_HEIGHT_SCRIPT: &str = "return document.body.scrollHeight";

/// Script extending the viewport to the bottom of the document
pub const SCROLL_TO_END_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Errors that can occur while driving a page source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("No element matches {locator}")]
    NotFound { locator: String },

    #[error("Invalid locator {locator}: {message}")]
    InvalidLocator { locator: String, message: String },

    #[error("Failed to load {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("No page loaded")]
    NoPage,

    #[error("Script error: {0}")]
    Script(String),
}

/// Result type for page source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Snapshot of one element of the loaded page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name, lowercase
    pub tag: String,

    /// Trimmed text content
    pub text: String,

    /// Attribute values; `href` and `src` are absolute URLs
    pub attributes: HashMap<String, String>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// One page-rendering session
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Loads `url`, replacing the current page
    async fn navigate(&mut self, url: &str) -> SourceResult<()>;

    /// Returns the first element matching `locator`
    async fn find_first(&self, locator: &str) -> SourceResult<Element>;

    /// Returns every element matching `locator`, possibly none
    async fn find_all(&self, locator: &str) -> SourceResult<Vec<Element>>;

    /// Evaluates a script in the page and returns its value
    async fn evaluate_script(&mut self, script: &str) -> SourceResult<serde_json::Value>;

    /// URL of the loaded page after redirects
    fn current_url(&self) -> Option<&str>;

    /// Releases the session
    async fn close(&mut self) -> SourceResult<()>;
}

/// Opens new page sources as the worker pool grows
pub trait PageSourceFactory: Send + Sync {
    fn open(&self) -> SourceResult<Box<dyn PageSource>>;
}
