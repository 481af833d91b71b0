//! SearchSession: debounced, race-safe incremental search.
//!
//! Every query change bumps `seq`.  A debounce timer and a lookup carry the
//! `seq` they were started under; when they report back, anything whose tag
//! is not the current `seq` is dropped.  That is the whole ordering story:
//! arrival order of lookup replies is irrelevant.
//!
//! Timers are truly cancelled (aborted) on new input.  Lookups are not
//! cancelled on the wire; their replies just fail the `seq` check.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use watchthis_proto::config::SearchConfig;
use watchthis_proto::movie::Movie;

use crate::api::MovieApi;
use crate::error::SyncResult;
use crate::event::SyncEvent;

#[derive(Debug)]
pub enum SearchEvent {
    DebounceElapsed { seq: u64 },
    Resolved {
        seq: u64,
        result: SyncResult<Vec<Movie>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKey {
    Down,
    Up,
    Enter,
    Escape,
}

/// Coarse state for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// Nothing typed, or below the minimum length.
    Idle,
    /// Waiting for the query to settle.
    Pending,
    Searching,
    Results,
    NoResults,
    Failed,
}

pub struct SearchSession {
    api: Arc<dyn MovieApi>,
    events: mpsc::Sender<SyncEvent>,
    config: SearchConfig,
    query: String,
    seq: u64,
    results: Vec<Movie>,
    cursor: Option<usize>,
    searching: bool,
    /// A lookup for the current query has been applied.
    resolved: bool,
    last_error: Option<String>,
    debounce: Option<JoinHandle<()>>,
}

impl SearchSession {
    pub fn new(api: Arc<dyn MovieApi>, events: mpsc::Sender<SyncEvent>, config: SearchConfig) -> Self {
        Self {
            api,
            events,
            config,
            query: String::new(),
            seq: 0,
            results: Vec::new(),
            cursor: None,
            searching: false,
            resolved: false,
            last_error: None,
            debounce: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn results(&self) -> &[Movie] {
        &self.results
    }

    /// Highlighted row; `None` when nothing is highlighted.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn status(&self) -> SearchStatus {
        if !self.meets_min_len(&self.query) {
            SearchStatus::Idle
        } else if self.searching {
            SearchStatus::Searching
        } else if self.last_error.is_some() {
            SearchStatus::Failed
        } else if !self.resolved {
            SearchStatus::Pending
        } else if self.results.is_empty() {
            SearchStatus::NoResults
        } else {
            SearchStatus::Results
        }
    }

    fn meets_min_len(&self, text: &str) -> bool {
        text.chars().count() >= self.config.min_query_len
    }

    /// New text from the input field.
    pub fn set_query(&mut self, text: &str) {
        if text == self.query {
            return;
        }
        self.query = text.to_string();
        self.seq += 1;
        self.cancel_debounce();
        self.searching = false;
        self.resolved = false;
        self.last_error = None;

        if !self.meets_min_len(text) {
            self.results.clear();
            self.cursor = None;
            return;
        }

        let seq = self.seq;
        let delay = self.config.debounce();
        let events = self.events.clone();
        self.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events
                .send(SyncEvent::Search(SearchEvent::DebounceElapsed { seq }))
                .await;
        }));
    }

    /// Returns true when visible state changed.
    pub fn on_event(&mut self, event: SearchEvent) -> bool {
        match event {
            SearchEvent::DebounceElapsed { seq } => self.on_debounce_elapsed(seq),
            SearchEvent::Resolved { seq, result } => self.on_resolved(seq, result),
        }
    }

    fn on_debounce_elapsed(&mut self, seq: u64) -> bool {
        if seq != self.seq {
            debug!("search: debounce #{} superseded by #{}", seq, self.seq);
            return false;
        }
        self.debounce = None;
        self.searching = true;
        let query = self.query.clone();
        info!("search: lookup #{} {:?}", seq, query);

        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = api.search(&query).await;
            let _ = events
                .send(SyncEvent::Search(SearchEvent::Resolved { seq, result }))
                .await;
        });
        true
    }

    fn on_resolved(&mut self, seq: u64, result: SyncResult<Vec<Movie>>) -> bool {
        if seq != self.seq {
            debug!("search: dropping stale result #{} (current #{})", seq, self.seq);
            return false;
        }
        self.searching = false;
        match result {
            Ok(mut movies) => {
                movies.truncate(self.config.max_results);
                debug!("search: #{} -> {} results", seq, movies.len());
                self.results = movies;
                self.cursor = None;
                self.resolved = true;
                self.last_error = None;
            }
            Err(e) => {
                warn!("search: lookup #{} failed: {}", seq, e);
                self.last_error = Some(e.to_string());
            }
        }
        true
    }

    /// Keyboard navigation.  Returns the movie committed by `Enter`.
    ///
    /// `Down`, `Up` and `Enter` are ignored while the result set is empty.
    /// `Escape` is not: it clears the session whatever its state, since it
    /// doubles as the key that dismisses the search popup.
    pub fn handle_key(&mut self, key: SearchKey) -> Option<Movie> {
        if key == SearchKey::Escape {
            self.clear();
            return None;
        }
        let n = self.results.len();
        if n == 0 {
            return None;
        }
        match key {
            SearchKey::Down => {
                self.cursor = Some(self.cursor.map_or(0, |i| (i + 1) % n));
                None
            }
            SearchKey::Up => {
                self.cursor = Some(self.cursor.map_or(n - 1, |i| (i + n - 1) % n));
                None
            }
            SearchKey::Enter => self.cursor.and_then(|i| self.pick(i)),
            SearchKey::Escape => None,
        }
    }

    /// Commit the result at `index`.  The session is cleared before the
    /// movie is handed back, so nothing downstream can observe old results.
    pub fn pick(&mut self, index: usize) -> Option<Movie> {
        let movie = self.results.get(index).cloned()?;
        self.clear();
        Some(movie)
    }

    /// Drop query, results and cursor.  Anything in flight becomes stale.
    pub fn clear(&mut self) {
        self.cancel_debounce();
        self.query.clear();
        self.seq += 1;
        self.results.clear();
        self.cursor = None;
        self.searching = false;
        self.resolved = false;
        self.last_error = None;
    }

    fn cancel_debounce(&mut self) {
        if let Some(timer) = self.debounce.take() {
            timer.abort();
        }
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.cancel_debounce();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ids, movie, movies, ScriptedApi};
    use std::time::Duration;

    fn session(api: ScriptedApi) -> (SearchSession, Arc<ScriptedApi>, mpsc::Receiver<SyncEvent>) {
        let api = Arc::new(api);
        let (tx, rx) = mpsc::channel(64);
        let s = SearchSession::new(api.clone(), tx, SearchConfig::default());
        (s, api, rx)
    }

    async fn next_event(rx: &mut mpsc::Receiver<SyncEvent>) -> SearchEvent {
        match rx.recv().await {
            Some(SyncEvent::Search(ev)) => ev,
            other => panic!("expected search event, got {:?}", other),
        }
    }

    /// Feed events back into the session until nothing arrives for a while.
    async fn settle(s: &mut SearchSession, rx: &mut mpsc::Receiver<SyncEvent>) {
        while let Ok(Some(SyncEvent::Search(ev))) =
            tokio::time::timeout(Duration::from_secs(5), rx.recv()).await
        {
            s.on_event(ev);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_typing_issues_one_lookup() {
        let api = ScriptedApi::new().search("Incep", Duration::ZERO, Ok(movies([1])));
        let (mut s, api, mut rx) = session(api);

        for text in ["In", "Inc", "Ince", "Incep"] {
            s.set_query(text);
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        settle(&mut s, &mut rx).await;

        assert_eq!(api.calls_to("search"), vec!["search Incep"]);
        assert_eq!(ids(s.results()), vec![1]);
        assert_eq!(s.status(), SearchStatus::Results);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_never_reaches_network_and_clears() {
        let api = ScriptedApi::new().search("Inc", Duration::ZERO, Ok(movies([1, 2])));
        let (mut s, api, mut rx) = session(api);

        s.set_query("Inc");
        settle(&mut s, &mut rx).await;
        s.handle_key(SearchKey::Down);
        assert_eq!(s.results().len(), 2);
        assert_eq!(s.cursor(), Some(0));

        s.set_query("I");
        assert!(s.results().is_empty());
        assert_eq!(s.cursor(), None);
        assert_eq!(s.status(), SearchStatus::Idle);
        settle(&mut s, &mut rx).await;
        assert_eq!(api.calls_to("search"), vec!["search Inc"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_replies_keep_newest() {
        let api = ScriptedApi::new()
            .search("Inc", Duration::from_secs(2), Ok(movies([1])))
            .search("Ince", Duration::from_millis(10), Ok(movies([2, 3])));
        let (mut s, _api, mut rx) = session(api);

        s.set_query("Inc");
        let ev = next_event(&mut rx).await;
        assert!(s.on_event(ev));
        assert!(s.is_searching());

        s.set_query("Ince");
        let ev = next_event(&mut rx).await;
        assert!(matches!(ev, SearchEvent::DebounceElapsed { .. }));
        s.on_event(ev);

        // Newer reply lands first, the older one afterwards.
        let newer = next_event(&mut rx).await;
        assert!(s.on_event(newer));
        let older = next_event(&mut rx).await;
        assert!(!s.on_event(older));

        assert_eq!(ids(s.results()), vec![2, 3]);
        assert!(!s.is_searching());
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_truncated_in_server_order() {
        let reply: Vec<Movie> = (1..=15).rev().map(|id| movie(id, "x")).collect();
        let api = ScriptedApi::new().search("star", Duration::ZERO, Ok(reply));
        let (mut s, _api, mut rx) = session(api);

        s.set_query("star");
        settle(&mut s, &mut rx).await;
        assert_eq!(ids(s.results()), (6..=15).rev().collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inception_scenario() {
        let api = ScriptedApi::new().search("Inc", Duration::ZERO, Ok(vec![movie(1, "Inception")]));
        let (mut s, api, mut rx) = session(api);

        s.set_query("Inc");
        settle(&mut s, &mut rx).await;
        assert_eq!(api.calls_to("search").len(), 1);
        assert_eq!(s.results().len(), 1);
        assert_eq!(s.cursor(), None);

        assert_eq!(s.handle_key(SearchKey::Down), None);
        assert_eq!(s.cursor(), Some(0));

        let picked = s.handle_key(SearchKey::Enter).expect("movie committed");
        assert_eq!(picked.id, 1);
        assert_eq!(s.query(), "");
        assert!(s.results().is_empty());
        assert_eq!(s.cursor(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_is_circular() {
        let api = ScriptedApi::new().search("ab", Duration::ZERO, Ok(movies([1, 2, 3, 4])));
        let (mut s, _api, mut rx) = session(api);
        s.set_query("ab");
        settle(&mut s, &mut rx).await;
        let n = s.results().len();

        s.handle_key(SearchKey::Down);
        s.handle_key(SearchKey::Down);
        let start = s.cursor();
        assert_eq!(start, Some(1));
        for _ in 0..n {
            s.handle_key(SearchKey::Down);
        }
        assert_eq!(s.cursor(), start);
        for _ in 0..n {
            s.handle_key(SearchKey::Up);
        }
        assert_eq!(s.cursor(), start);

        s.handle_key(SearchKey::Down);
        s.handle_key(SearchKey::Up);
        assert_eq!(s.cursor(), start);

        s.handle_key(SearchKey::Escape);
        s.set_query("ab");
        settle(&mut s, &mut rx).await;
        // From no selection, Up wraps to the last row.
        s.handle_key(SearchKey::Up);
        assert_eq!(s.cursor(), Some(n - 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_ignored_without_results() {
        let (mut s, _api, _rx) = session(ScriptedApi::new());
        s.set_query("zz");
        assert_eq!(s.handle_key(SearchKey::Down), None);
        assert_eq!(s.handle_key(SearchKey::Enter), None);
        assert_eq!(s.cursor(), None);
        assert_eq!(s.query(), "zz");

        assert_eq!(s.handle_key(SearchKey::Escape), None);
        assert_eq!(s.query(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_without_cursor_commits_nothing() {
        let api = ScriptedApi::new().search("ab", Duration::ZERO, Ok(movies([1])));
        let (mut s, _api, mut rx) = session(api);
        s.set_query("ab");
        settle(&mut s, &mut rx).await;
        assert_eq!(s.handle_key(SearchKey::Enter), None);
        assert_eq!(s.results().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_escape_clears_and_in_flight_result_is_dropped() {
        let api = ScriptedApi::new().search("ab", Duration::from_millis(200), Ok(movies([1])));
        let (mut s, _api, mut rx) = session(api);
        s.set_query("ab");
        let ev = next_event(&mut rx).await;
        s.on_event(ev);
        assert!(s.is_searching());

        s.handle_key(SearchKey::Escape);
        assert_eq!(s.query(), "");
        let late = next_event(&mut rx).await;
        assert!(!s.on_event(late));
        assert!(s.results().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pick_clears_before_returning() {
        let api = ScriptedApi::new().search("ab", Duration::ZERO, Ok(movies([1, 2])));
        let (mut s, _api, mut rx) = session(api);
        s.set_query("ab");
        settle(&mut s, &mut rx).await;
        let seq = s.seq();

        assert_eq!(s.pick(1).map(|m| m.id), Some(2));
        assert!(s.seq() > seq);
        assert!(s.results().is_empty());
        assert_eq!(s.pick(0), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_lookup_keeps_prior_results() {
        let api = ScriptedApi::new()
            .search("ab", Duration::ZERO, Ok(movies([1])))
            .search("abc", Duration::ZERO, Err(502));
        let (mut s, _api, mut rx) = session(api);
        s.set_query("ab");
        settle(&mut s, &mut rx).await;
        s.set_query("abc");
        settle(&mut s, &mut rx).await;

        assert_eq!(s.status(), SearchStatus::Failed);
        assert!(!s.is_searching());
        assert_eq!(ids(s.results()), vec![1]);
        assert!(s.last_error().unwrap().contains("502"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_result_is_not_an_error() {
        let (mut s, _api, mut rx) = session(ScriptedApi::new());
        s.set_query("qwerty");
        assert_eq!(s.status(), SearchStatus::Pending);
        settle(&mut s, &mut rx).await;
        assert_eq!(s.status(), SearchStatus::NoResults);
        assert!(s.last_error().is_none());
    }
}
