//! URL handling module for Shelf-Crawler
//!
//! This module provides URL normalization, href resolution and the
//! host-prefix containment check used by the frontier.

mod normalize;

// Re-export main functions
pub use normalize::{normalize_url, resolve_href};

/// Returns true if `url` lies under `host_prefix`
///
/// Both strings are expected to be normalized. This is a plain prefix test:
/// the crawl never leaves the seed host, and anything outside it is dropped
/// before it can reach the queue.
pub fn within_host(url: &str, host_prefix: &str) -> bool {
    url.starts_with(host_prefix)
}
