//! Action enum: all user-initiated intents.

use watchthis_proto::movie::Movie;
use watchthis_sync::{Feed, SearchKey};

/// Unique identifier for a focusable pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Catalog,
    Recommendations,
    Search,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Navigation ───────────────────────────────────────────────────────────
    SwitchTab(Feed),
    NextTab,
    PrevTab,
    FocusNext,

    // ── Selection ────────────────────────────────────────────────────────────
    Select(Movie),

    // ── Search ───────────────────────────────────────────────────────────────
    OpenSearch,
    QueryChanged(String),
    SearchKey(SearchKey),

    // ── Misc ─────────────────────────────────────────────────────────────────
    CopyTrailer,
    Quit,
}

/// Cycle order of the catalog tabs.
pub fn next_feed(feed: Feed) -> Feed {
    let i = Feed::ALL.iter().position(|f| *f == feed).unwrap_or(0);
    Feed::ALL[(i + 1) % Feed::ALL.len()]
}

pub fn prev_feed(feed: Feed) -> Feed {
    let i = Feed::ALL.iter().position(|f| *f == feed).unwrap_or(0);
    Feed::ALL[(i + Feed::ALL.len() - 1) % Feed::ALL.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_cycle_wraps() {
        assert_eq!(next_feed(Feed::Trending), Feed::Popular);
        assert_eq!(next_feed(Feed::Upcoming), Feed::Trending);
        assert_eq!(prev_feed(Feed::Trending), Feed::Upcoming);
        assert_eq!(prev_feed(Feed::Popular), Feed::Trending);
    }
}
