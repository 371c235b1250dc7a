//! HTTP fetching for the HTTP page source
//!
//! This module handles:
//! - Building the shared HTTP client with the configured user agent
//! - GET requests with status and Content-Type checks
//! - Classifying failures into navigation errors

use crate::config::FetcherConfig;
use crate::source::{SourceError, SourceResult};
use reqwest::Client;
use std::time::Duration;

/// A successfully loaded HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Page body
    pub body: String,
}

/// Builds the HTTP client shared by page sources and the image store
///
/// # Example
///
/// ```no_run
/// use shelf_crawler::config::FetcherConfig;
/// use shelf_crawler::source::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches `url` and returns its HTML body
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with HTML (or no) Content-Type | `Ok(FetchedPage)` |
/// | Non-2xx status | `Navigation` error carrying the status |
/// | Non-HTML Content-Type | `Navigation` error carrying the type |
/// | Timeout / connection failure | `Navigation` error |
pub async fn fetch_page(client: &Client, url: &str) -> SourceResult<FetchedPage> {
    let navigation_error = |message: String| SourceError::Navigation {
        url: url.to_string(),
        message,
    };

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            navigation_error("Request timeout".to_string())
        } else if e.is_connect() {
            navigation_error("Connection refused".to_string())
        } else {
            navigation_error(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(navigation_error(format!("HTTP {}", status.as_u16())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.is_empty() && !content_type.contains("text/html") {
        return Err(navigation_error(format!(
            "Expected HTML, got {}",
            content_type
        )));
    }

    let final_url = response.url().to_string();
    let body = response
        .text()
        .await
        .map_err(|e| navigation_error(e.to_string()))?;

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        body,
    })
}
