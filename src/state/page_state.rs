/// Page state definitions for one visit of a URL
///
/// ```text
/// Fetched -> Detail  -> Done | Requeued | Skipped
/// Fetched -> Listing -> Done
/// (navigation failure) -> LoadFailed
/// ```
use std::fmt;

/// Represents the state of a page during one visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Page loaded, not yet classified
    Fetched,

    /// Page carries the detail marker; a product is being extracted
    Detail,

    /// Page has no detail marker; links are being harvested
    Listing,

    // ===== Terminal States =====
    /// Links harvested or product written; URL is processed
    Done,

    /// Extraction failed and the URL went back on the queue
    Requeued,

    /// Extraction failed too often; URL is processed and skipped
    Skipped,

    /// Navigation failed; the URL is dropped for this crawl
    LoadFailed,
}

impl PageState {
    /// Returns true if the visit is over
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Fetched | Self::Detail | Self::Listing)
    }

    /// Returns true if the visit ended in a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Requeued | Self::Skipped | Self::LoadFailed)
    }

    /// Returns true if the visit may move from `self` to `next`
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Fetched, Self::Detail)
                | (Self::Fetched, Self::Listing)
                | (Self::Detail, Self::Done)
                | (Self::Detail, Self::Requeued)
                | (Self::Detail, Self::Skipped)
                | (Self::Listing, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetched => "fetched",
            Self::Detail => "detail",
            Self::Listing => "listing",
            Self::Done => "done",
            Self::Requeued => "requeued",
            Self::Skipped => "skipped",
            Self::LoadFailed => "load_failed",
        }
    }

    /// Returns all terminal states
    pub fn terminal_states() -> [Self; 4] {
        [Self::Done, Self::Requeued, Self::Skipped, Self::LoadFailed]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
