//! Crawl frontier
//!
//! The frontier owns every piece of mutable crawl state:
//! - the set of processed URLs and the queue of pending ones
//! - the category index built from listing-page breadcrumbs
//! - the product counter and the per-URL retry ledger
//!
//! `Frontier` is the plain single-owner structure. Workers reach it through
//! `SharedFrontier`, which serializes every operation behind one lock.
//! `FrontierState` is the serializable snapshot persisted by the checkpoint
//! store.

mod queue;
mod shared;
mod state;

pub use queue::{Frontier, RetryDecision};
pub use shared::SharedFrontier;
pub use state::FrontierState;

use thiserror::Error;

/// Separator placed between breadcrumb names in a category path
pub const CATEGORY_SEPARATOR: &str = " > ";

/// Errors reported by frontier lookups
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrontierError {
    #[error("No category recorded for {0}")]
    NotFound(String),
}

/// Joins breadcrumb names into a category path
///
/// Blank crumbs are dropped and the remaining names trimmed.
///
/// ```
/// use shelf_crawler::frontier::category_path;
///
/// assert_eq!(category_path(["Home", " Snacks "]), "Home > Snacks");
/// ```
pub fn category_path<I, S>(crumbs: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    crumbs
        .into_iter()
        .map(|crumb| crumb.as_ref().trim().to_string())
        .filter(|crumb| !crumb.is_empty())
        .collect::<Vec<_>>()
        .join(CATEGORY_SEPARATOR)
}
