//! Extraction dispatcher
//!
//! Runs the per-visit state machine: classify the loaded page, then either
//! harvest its links (listing) or extract one product record (detail).
//! Listing pages never fail a visit. Detail failures go through the
//! frontier's retry ledger.

use crate::config::Locators;
use crate::frontier::{category_path, FrontierError, RetryDecision, SharedFrontier};
use crate::images::{ImageError, ImageMaterializer};
use crate::output::{OutputError, Product, SharedSink};
use crate::source::{
    Element, PageSource, SourceError, SourceResult, SCROLL_HEIGHT_SCRIPT, SCROLL_TO_END_SCRIPT,
};
use crate::state::PageState;
use std::sync::{Arc, PoisonError};
use thiserror::Error;

/// Reasons a detail page did not produce a product
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Missing required element: {0}")]
    Source(#[from] SourceError),

    #[error("Image element has no src")]
    MissingImageSource,

    #[error("No price at either location")]
    MissingPrice,

    #[error("Price '{0}' is not a number")]
    InvalidPrice(String),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

/// Per-page classification and extraction, shared by all workers
#[derive(Clone)]
pub struct Dispatcher {
    frontier: SharedFrontier,
    images: Arc<dyn ImageMaterializer>,
    sink: SharedSink,
    locators: Arc<Locators>,
    max_scroll_rounds: u32,
}

impl Dispatcher {
    pub fn new(
        frontier: SharedFrontier,
        images: Arc<dyn ImageMaterializer>,
        sink: SharedSink,
        locators: Locators,
        max_scroll_rounds: u32,
    ) -> Self {
        Self {
            frontier,
            images,
            sink,
            locators: Arc::new(locators),
            max_scroll_rounds,
        }
    }

    /// Loads `url` into `source` and handles the page
    ///
    /// A URL whose page cannot be loaded is marked processed and never
    /// retried.
    pub async fn visit(&self, source: &mut dyn PageSource, url: &str) -> PageState {
        if let Err(e) = source.navigate(url).await {
            tracing::warn!("Failed to load {}: {}", url, e);
            self.frontier.mark_processed(url);
            return PageState::LoadFailed;
        }

        self.dispatch(source, url).await
    }

    /// Classifies the page already loaded in `source` and handles it
    pub async fn dispatch(&self, source: &mut dyn PageSource, url: &str) -> PageState {
        let state = PageState::Fetched;
        let next = if self.is_detail(source, url).await {
            PageState::Detail
        } else {
            PageState::Listing
        };
        debug_assert!(state.can_transition_to(next));
        tracing::trace!("{}: {} -> {}", url, state, next);

        match next {
            PageState::Detail => self.handle_detail(source, url).await,
            _ => {
                self.handle_listing(source, url).await;
                PageState::Done
            }
        }
    }

    async fn is_detail(&self, source: &dyn PageSource, url: &str) -> bool {
        match source.find_first(&self.locators.detail_marker).await {
            Ok(_) => true,
            Err(SourceError::NotFound { .. }) => false,
            Err(e) => {
                tracing::warn!("Could not classify {}, treating as listing: {}", url, e);
                false
            }
        }
    }

    async fn handle_listing(&self, source: &mut dyn PageSource, url: &str) {
        if let Err(e) = self.reveal_all(source).await {
            tracing::debug!("Could not reveal all of {}: {}", url, e);
        }

        let crumbs = self.find_all_or_empty(source, &self.locators.breadcrumb).await;
        let category = category_path(crumbs.iter().map(|crumb| crumb.text.as_str()));

        let links = self.find_all_or_empty(source, &self.locators.links).await;
        let hrefs: Vec<&str> = links.iter().filter_map(|link| link.attr("href")).collect();

        let current_url = source.current_url().unwrap_or(url).to_string();

        let admitted = self.frontier.with(|frontier| {
            let mut admitted = 0;
            for href in &hrefs {
                if frontier.enqueue(href) {
                    admitted += 1;
                }
                // Already processed pages still gain this listing's category.
                frontier.attribute_category(&category, href);
            }
            frontier.mark_processed(url);
            frontier.mark_processed(&current_url);
            admitted
        });

        tracing::debug!(
            "Listing {}: {} links, {} queued, category '{}'",
            url,
            hrefs.len(),
            admitted,
            category
        );
    }

    async fn find_all_or_empty(&self, source: &dyn PageSource, locator: &str) -> Vec<Element> {
        source.find_all(locator).await.unwrap_or_else(|e| {
            tracing::debug!("Query {} failed: {}", locator, e);
            Vec::new()
        })
    }

    /// Extends the viewport until the document stops growing
    ///
    /// Stops after two consecutive equal height polls, or after
    /// `max_scroll_rounds` extensions.
    async fn reveal_all(&self, source: &mut dyn PageSource) -> SourceResult<()> {
        let mut height = scroll_height(source).await?;

        for _ in 0..self.max_scroll_rounds {
            source.evaluate_script(SCROLL_TO_END_SCRIPT).await?;
            let current = scroll_height(source).await?;
            if current <= height {
                return Ok(());
            }
            height = current;
        }

        tracing::debug!(
            "Page still growing after {} scroll rounds",
            self.max_scroll_rounds
        );
        Ok(())
    }

    async fn handle_detail(&self, source: &mut dyn PageSource, url: &str) -> PageState {
        let product = match self.extract(source, url).await {
            Ok(product) => product,
            Err(e) => return self.fail(url, e),
        };

        let loaded_url = source.current_url().unwrap_or(url);
        match self.emit(loaded_url, url, &product) {
            Ok(count) => {
                tracing::debug!("Product #{} '{}' from {}", count, product.name, url);
                PageState::Done
            }
            Err(e) => self.fail(url, e.into()),
        }
    }

    /// Reads a product from the loaded detail page
    async fn extract(
        &self,
        source: &dyn PageSource,
        url: &str,
    ) -> Result<Product, ExtractionError> {
        let locators = &self.locators;

        let image = source.find_first(&locators.image).await?;
        let image_src = image
            .attr("src")
            .ok_or(ExtractionError::MissingImageSource)?
            .to_string();
        let name = source.find_first(&locators.title).await?.text;
        let weight = source.find_first(&locators.weight).await?.text;
        let price = self.read_price(source).await?;
        let short_description = source
            .find_all(&locators.description)
            .await?
            .into_iter()
            .next()
            .map(|element| element.text)
            .unwrap_or_default();

        let category = self.category_of(source.current_url().unwrap_or(url), url);
        let image = self.images.materialize(&image_src, &name).await?;

        Ok(Product {
            image,
            name,
            weight,
            category,
            price,
            short_description,
        })
    }

    async fn read_price(&self, source: &dyn PageSource) -> Result<i64, ExtractionError> {
        let primary = first_text(source.find_all(&self.locators.price_primary).await?);
        let text = match primary {
            Some(text) => text,
            None => first_text(source.find_all(&self.locators.price_secondary).await?)
                .ok_or(ExtractionError::MissingPrice)?,
        };
        parse_price(&text)
    }

    /// Looks the page up under its loaded URL, then the URL it was taken as
    fn category_of(&self, current_url: &str, url: &str) -> String {
        match self.frontier.lookup_category(current_url) {
            Ok(category) => category,
            Err(FrontierError::NotFound(_)) => {
                self.frontier.lookup_category(url).unwrap_or_else(|_| {
                    tracing::debug!("{} is uncategorized", url);
                    String::new()
                })
            }
        }
    }

    /// Writes the record and counts it while holding the sink
    ///
    /// The loaded URL is marked processed too, so a redirect target linked
    /// from another listing is not extracted again.
    fn emit(&self, loaded_url: &str, url: &str, product: &Product) -> Result<u64, OutputError> {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.write_record(product)?;
        Ok(self.frontier.with(|frontier| {
            frontier.mark_processed(loaded_url);
            frontier.record_product(url)
        }))
    }

    fn fail(&self, url: &str, error: ExtractionError) -> PageState {
        match self.frontier.retry_or_skip(url) {
            RetryDecision::Requeued { attempts } => {
                tracing::warn!(
                    "Extraction failed for {} (attempt {}), requeued: {}",
                    url,
                    attempts,
                    error
                );
                PageState::Requeued
            }
            RetryDecision::Skipped { attempts } => {
                tracing::warn!(
                    "Extraction failed for {} after {} attempts, skipping: {}",
                    url,
                    attempts,
                    error
                );
                PageState::Skipped
            }
        }
    }
}

async fn scroll_height(source: &mut dyn PageSource) -> SourceResult<f64> {
    let value = source.evaluate_script(SCROLL_HEIGHT_SCRIPT).await?;
    value
        .as_f64()
        .ok_or_else(|| SourceError::Script(format!("Scroll height is not a number: {}", value)))
}

fn first_text(elements: Vec<Element>) -> Option<String> {
    elements
        .into_iter()
        .next()
        .map(|element| element.text)
        .filter(|text| !text.trim().is_empty())
}

/// Parses a price in the smallest currency unit
///
/// The text must be a plain integer. Thousands separators are accepted;
/// currency symbols and decimal points are not.
pub fn parse_price(text: &str) -> Result<i64, ExtractionError> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    cleaned
        .parse()
        .map_err(|_| ExtractionError::InvalidPrice(text.trim().to_string()))
}
