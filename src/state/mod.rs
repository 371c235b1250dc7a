//! Page-visit state machine
//!
//! Every `(worker, URL)` visit walks `PageState` from `Fetched` through
//! `Detail` or `Listing` to one terminal outcome.

mod page_state;

pub use page_state::PageState;
