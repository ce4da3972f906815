//! A search session over one block of text.
//!
//! The session owns the text, the compiled-pattern cache, the debounce
//! timer, and the navigable result set. Query changes are visible
//! immediately; match recomputation is deferred by the debounce window and
//! always runs from scratch against the latest query — staleness is bounded
//! only by the window.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::config::SearchConfig;
use crate::search::cache::PatternCache;
use crate::search::debounce::Debouncer;
use crate::search::engine::{find_matches, SearchResult};
use crate::search::highlight::{self, Segment};

/// Snapshot of a session's search state.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// The query as last typed (may lag behind `results` by the debounce
    /// window).
    pub query: String,

    /// Matches ordered by ascending index, never overlapping.
    pub results: Vec<SearchResult>,

    /// Index into `results` of the active match; `None` when there is none.
    pub current: Option<usize>,

    /// True when the iteration cap cut the last scan short.
    pub truncated: bool,
}

impl SearchState {
    /// Whether the search has any matches.
    pub fn is_active(&self) -> bool {
        !self.results.is_empty()
    }

    /// 1-based "match m of n" pair for display, if any match is current.
    pub fn position(&self) -> Option<(usize, usize)> {
        self.current.map(|i| (i + 1, self.results.len()))
    }
}

struct Inner {
    text: Arc<str>,
    cache: PatternCache,
    state: SearchState,
}

impl Inner {
    /// Recompute matches from scratch for `query`.
    fn execute(&mut self, query: &str, config: &SearchConfig) {
        self.state.query = query.to_string();
        let outcome = match self.cache.get(query) {
            Some(regex) => find_matches(&self.text, &regex, config),
            None => Default::default(),
        };
        debug!(
            "search for {query:?}: {} match(es){}",
            outcome.results.len(),
            if outcome.truncated { " (truncated)" } else { "" }
        );
        self.state.current = if outcome.results.is_empty() {
            None
        } else {
            Some(0)
        };
        self.state.results = outcome.results;
        self.state.truncated = outcome.truncated;
    }
}

/// Debounced, navigable search over a fixed text.
pub struct SearchSession {
    inner: Arc<Mutex<Inner>>,
    debouncer: Debouncer,
    config: SearchConfig,
}

impl SearchSession {
    pub fn new(text: impl Into<Arc<str>>, config: SearchConfig) -> Self {
        let cache = PatternCache::new(config.cache_capacity, config.cache_trim_batch);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                text: text.into(),
                cache,
                state: SearchState::default(),
            })),
            debouncer: Debouncer::new(config.debounce),
            config,
        }
    }

    /// Update the query. The query string is applied immediately; match
    /// recomputation runs once the debounce window closes, and only for the
    /// most recent query within it. Must be called from within a tokio
    /// runtime.
    pub fn set_query(&mut self, query: &str) {
        self.inner.lock().unwrap().state.query = query.to_string();

        let inner = Arc::clone(&self.inner);
        let config = self.config.clone();
        let query = query.to_string();
        self.debouncer.call(move || {
            inner.lock().unwrap().execute(&query, &config);
        });
    }

    /// Search immediately, bypassing the debounce window.
    pub fn search_now(&mut self, query: &str) {
        self.debouncer.cancel();
        self.inner.lock().unwrap().execute(query, &self.config);
    }

    /// Snapshot of the current search state.
    pub fn state(&self) -> SearchState {
        self.inner.lock().unwrap().state.clone()
    }

    /// The text this session searches.
    pub fn text(&self) -> Arc<str> {
        Arc::clone(&self.inner.lock().unwrap().text)
    }

    /// Move the cursor to the next match, wrapping at the end. No-op when
    /// there are no matches.
    pub fn next(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        let len = inner.state.results.len();
        if len > 0 {
            inner.state.current = Some(inner.state.current.map_or(0, |i| (i + 1) % len));
        }
    }

    /// Move the cursor to the previous match, wrapping at the start. No-op
    /// when there are no matches.
    pub fn previous(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        let len = inner.state.results.len();
        if len > 0 {
            inner.state.current = Some(inner.state.current.map_or(0, |i| (i + len - 1) % len));
        }
    }

    /// Clear the query and results, cancelling any pending recomputation.
    pub fn clear(&mut self) {
        self.debouncer.cancel();
        self.inner.lock().unwrap().state = SearchState::default();
    }

    /// Partition the text into plain/matched segments for rendering.
    pub fn highlight(&self) -> Vec<Segment> {
        let inner = self.inner.lock().unwrap();
        highlight::segments(&inner.text, &inner.state.results, inner.state.current)
    }

    /// Number of compiled patterns currently cached. Exposed for tests.
    #[cfg(test)]
    pub(crate) fn cached_patterns(&self) -> usize {
        self.inner.lock().unwrap().cache.len()
    }
}
