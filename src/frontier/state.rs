use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable snapshot of the frontier
///
/// Collections are stored in a canonical order (sorted sets, queue order for
/// `queued`) so that two snapshots of the same frontier compare equal and
/// serialize to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierState {
    /// URLs whose page has been fully handled, sorted
    pub processed: Vec<String>,

    /// URLs discovered but not yet visited, in take order
    pub queued: Vec<String>,

    /// Category path -> detail URLs attributed to it (sorted)
    pub category_index: BTreeMap<String, Vec<String>>,

    /// Number of product records written so far
    pub products_count: u64,

    /// Failed extraction attempts per URL still eligible for retry
    #[serde(default)]
    pub retries: BTreeMap<String, u32>,

    /// URLs given up on after exhausting their retries (also in `processed`)
    #[serde(default)]
    pub skipped: Vec<String>,

    /// URL -> first category it was attributed to
    #[serde(default)]
    pub url_categories: BTreeMap<String, String>,
}

impl FrontierState {
    /// Returns true if the snapshot carries no crawl progress at all
    pub fn is_empty(&self) -> bool {
        self.processed.is_empty() && self.queued.is_empty() && self.products_count == 0
    }
}
