use crate::frontier::{FrontierError, FrontierState};
use crate::url::{normalize_url, within_host};
use crate::UrlError;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Outcome of reporting a failed detail extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The URL went back on the queue; `attempts` failures so far
    Requeued { attempts: u32 },

    /// The URL exhausted its retries and is now terminal
    Skipped { attempts: u32 },
}

/// The crawl frontier: processed set, pending queue and category index
///
/// Invariants kept by every method:
/// - a URL is never both processed and queued
/// - a URL is queued at most once
/// - only URLs under the host prefix are ever queued by `enqueue`
/// - `products_count` only grows, one step per recorded product
#[derive(Debug, Clone)]
pub struct Frontier {
    /// Normalized seed URL every enqueued URL must start with
    host_prefix: String,

    /// Re-queues allowed per URL before it is skipped
    max_retries: u32,

    processed: HashSet<String>,

    /// Take order; mirrors `queued` exactly
    queue: VecDeque<String>,
    queued: HashSet<String>,

    categories: BTreeMap<String, BTreeSet<String>>,

    /// First category each URL was attributed to
    url_categories: HashMap<String, String>,

    products_count: u64,
    retries: HashMap<String, u32>,
    skipped: HashSet<String>,
}

impl Frontier {
    /// Creates an empty frontier confined to `host_prefix`
    pub fn new(host_prefix: &str, max_retries: u32) -> Result<Self, UrlError> {
        let host_prefix = normalize_url(host_prefix)?.to_string();

        Ok(Self {
            host_prefix,
            max_retries,
            processed: HashSet::new(),
            queue: VecDeque::new(),
            queued: HashSet::new(),
            categories: BTreeMap::new(),
            url_categories: HashMap::new(),
            products_count: 0,
            retries: HashMap::new(),
            skipped: HashSet::new(),
        })
    }

    /// Creates a frontier and rehydrates it from a checkpoint snapshot
    pub fn from_state(
        host_prefix: &str,
        max_retries: u32,
        state: FrontierState,
    ) -> Result<Self, UrlError> {
        let mut frontier = Self::new(host_prefix, max_retries)?;
        frontier.restore(state);
        Ok(frontier)
    }

    /// Returns the normalized host prefix
    pub fn host_prefix(&self) -> &str {
        &self.host_prefix
    }

    /// Queues `url` without the host or processed checks
    ///
    /// Meant for the root URL of a fresh crawl.
    pub fn seed(&mut self, url: &str) {
        let url = canonical(url);
        self.push(url);
    }

    /// Removes and returns the next URL to visit
    pub fn take(&mut self) -> Option<String> {
        let url = self.queue.pop_front()?;
        self.queued.remove(&url);
        Some(url)
    }

    /// Queues `url` if it is under the host prefix and not yet processed
    ///
    /// Returns true if the URL is queued after the call. Unparseable URLs,
    /// foreign hosts and already processed URLs are silently ignored.
    pub fn enqueue(&mut self, url: &str) -> bool {
        let url = match normalize_url(url) {
            Ok(url) => url.to_string(),
            Err(_) => return false,
        };

        if !within_host(&url, &self.host_prefix) || self.processed.contains(&url) {
            return false;
        }

        self.push(url);
        true
    }

    /// Marks `url` as fully handled; marking twice is a no-op
    pub fn mark_processed(&mut self, url: &str) {
        let url = canonical(url);

        if self.queued.remove(&url) {
            self.queue.retain(|queued| queued != &url);
        }
        self.retries.remove(&url);
        self.processed.insert(url);
    }

    /// Marks `url` processed and counts one more written product
    ///
    /// Returns the new product count.
    pub fn record_product(&mut self, url: &str) -> u64 {
        self.mark_processed(url);
        self.products_count += 1;
        self.products_count
    }

    /// Records a failed detail extraction for `url`
    ///
    /// The URL is re-queued until it has failed more than `max_retries`
    /// times; after that it is marked processed and remembered as skipped,
    /// which guarantees the crawl terminates even on pages that never parse.
    pub fn retry_or_skip(&mut self, url: &str) -> RetryDecision {
        let url = canonical(url);
        let attempts = {
            let counter = self.retries.entry(url.clone()).or_insert(0);
            *counter += 1;
            *counter
        };

        if attempts > self.max_retries {
            self.mark_processed(&url);
            self.skipped.insert(url);
            return RetryDecision::Skipped { attempts };
        }

        if !self.enqueue(&url) {
            // Outside the host or already processed: nothing left to retry.
            self.retries.remove(&url);
            return RetryDecision::Skipped { attempts };
        }

        RetryDecision::Requeued { attempts }
    }

    /// Records that `url` was linked from a listing page under `category`
    ///
    /// Links outside the host prefix are not indexed.
    pub fn attribute_category(&mut self, category: &str, url: &str) {
        if category.is_empty() {
            return;
        }

        let url = canonical(url);
        if !within_host(&url, &self.host_prefix) {
            return;
        }
        self.url_categories
            .entry(url.clone())
            .or_insert_with(|| category.to_string());
        self.categories
            .entry(category.to_string())
            .or_default()
            .insert(url);
    }

    /// Returns the category `url` was first attributed to
    pub fn lookup_category(&self, url: &str) -> Result<&str, FrontierError> {
        let url = canonical(url);
        self.url_categories
            .get(&url)
            .map(String::as_str)
            .ok_or(FrontierError::NotFound(url))
    }

    /// Returns true when nothing is left to visit
    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of queued URLs
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Returns the number of processed URLs
    pub fn processed_len(&self) -> usize {
        self.processed.len()
    }

    /// Returns the number of URLs given up on
    pub fn skipped_len(&self) -> usize {
        self.skipped.len()
    }

    /// Returns the number of products written so far
    pub fn products_count(&self) -> u64 {
        self.products_count
    }

    /// Returns the number of known categories
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn is_processed(&self, url: &str) -> bool {
        self.processed.contains(&canonical(url))
    }

    pub fn is_queued(&self, url: &str) -> bool {
        self.queued.contains(&canonical(url))
    }

    /// Captures the full frontier as a serializable snapshot
    pub fn snapshot(&self) -> FrontierState {
        let mut processed: Vec<String> = self.processed.iter().cloned().collect();
        processed.sort();

        let mut skipped: Vec<String> = self.skipped.iter().cloned().collect();
        skipped.sort();

        FrontierState {
            processed,
            queued: self.queue.iter().cloned().collect(),
            category_index: self
                .categories
                .iter()
                .map(|(category, urls)| (category.clone(), urls.iter().cloned().collect()))
                .collect(),
            products_count: self.products_count,
            retries: self
                .retries
                .iter()
                .map(|(url, attempts)| (url.clone(), *attempts))
                .collect(),
            skipped,
            url_categories: self
                .url_categories
                .iter()
                .map(|(url, category)| (url.clone(), category.clone()))
                .collect(),
        }
    }

    /// Replaces the frontier contents with a snapshot
    ///
    /// Queued entries that are also processed are dropped, so a snapshot
    /// written by an older or buggy writer cannot break the disjointness of
    /// the two sets. Snapshots without `url_categories` get the lookup table
    /// rebuilt from the category index in path order.
    pub fn restore(&mut self, state: FrontierState) {
        self.processed = state.processed.into_iter().collect();

        self.queue.clear();
        self.queued.clear();
        for url in state.queued {
            if !self.processed.contains(&url) {
                self.push(url);
            }
        }

        self.categories = state
            .category_index
            .into_iter()
            .map(|(category, urls)| (category, urls.into_iter().collect()))
            .collect();

        self.url_categories = state.url_categories.into_iter().collect();
        if self.url_categories.is_empty() {
            for (category, urls) in &self.categories {
                for url in urls {
                    self.url_categories
                        .entry(url.clone())
                        .or_insert_with(|| category.clone());
                }
            }
        }

        self.products_count = state.products_count;
        self.retries = state.retries.into_iter().collect();
        self.skipped = state.skipped.into_iter().collect();
    }

    fn push(&mut self, url: String) {
        if self.queued.insert(url.clone()) {
            self.queue.push_back(url);
        }
    }
}

/// Normalizes `url` when possible, falling back to the trimmed input
fn canonical(url: &str) -> String {
    normalize_url(url)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| url.trim().to_string())
}
