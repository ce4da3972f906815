//! Compiled-pattern cache with batched LRU trimming.
//!
//! Queries are escaped and compiled into case-insensitive literal matchers.
//! Compilation is cheap but not free, and interactive search re-runs the
//! same handful of queries constantly (every backspace revisits a prefix),
//! so compiled patterns are memoised keyed by the literal query string.
//!
//! Trimming removes a batch of oldest-used entries once the bound is
//! exceeded instead of evicting one entry per insert, amortising cleanup
//! across many inserts.

use lru::LruCache;
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Bounded cache of compiled literal patterns.
pub struct PatternCache {
    entries: LruCache<String, Regex>,
    capacity: usize,
    trim_batch: usize,
}

impl PatternCache {
    pub fn new(capacity: usize, trim_batch: usize) -> Self {
        Self {
            // Unbounded storage; the bound is enforced by `trim` so eviction
            // can happen in batches.
            entries: LruCache::unbounded(),
            capacity: capacity.max(1),
            trim_batch,
        }
    }

    /// Fetch or compile the matcher for a query.
    ///
    /// Returns `None` for blank queries and for compilation failures —
    /// search failures are silent/degraded, never surfaced (a literal,
    /// escaped pattern should never fail to compile, but if it does the
    /// caller simply sees no results).
    pub fn get(&mut self, query: &str) -> Option<Regex> {
        if query.trim().is_empty() {
            return None;
        }

        if let Some(regex) = self.entries.get(query) {
            return Some(regex.clone());
        }

        let regex = match RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .build()
        {
            Ok(regex) => regex,
            Err(e) => {
                warn!("failed to compile search pattern for {query:?}: {e}");
                return None;
            }
        };

        self.entries.push(query.to_string(), regex.clone());
        self.trim();
        Some(regex)
    }

    /// Evict oldest-used entries in a batch once over capacity.
    fn trim(&mut self) {
        if self.entries.len() <= self.capacity {
            return;
        }
        let target = self.capacity.saturating_sub(self.trim_batch);
        while self.entries.len() > target {
            self.entries.pop_lru();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_queries_compile_to_nothing() {
        let mut cache = PatternCache::new(10, 2);
        assert!(cache.get("").is_none());
        assert!(cache.get("   ").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn patterns_are_memoised() {
        let mut cache = PatternCache::new(10, 2);
        cache.get("needle").expect("compiles");
        cache.get("needle").expect("cached");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn metacharacters_are_escaped() {
        let mut cache = PatternCache::new(10, 2);
        let regex = cache.get("a.c").expect("compiles");
        assert!(regex.is_match("xa.cx"));
        assert!(!regex.is_match("abc"), "dot must be literal");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let mut cache = PatternCache::new(10, 2);
        let regex = cache.get("CaT").expect("compiles");
        assert!(regex.is_match("the cat sat"));
        assert!(regex.is_match("the CAT sat"));
    }

    #[test]
    fn overflow_trims_a_batch_of_oldest_entries() {
        let mut cache = PatternCache::new(5, 2);
        for i in 0..6 {
            cache.get(&format!("query-{i}"));
        }
        // Exceeding 5 trims down to 5 - 2 = 3, not to 5.
        assert_eq!(cache.len(), 3);
        // The survivors are the most recently used.
        assert!(cache.entries.contains("query-5"));
        assert!(cache.entries.contains("query-4"));
        assert!(cache.entries.contains("query-3"));
    }

    #[test]
    fn lookup_refreshes_recency() {
        let mut cache = PatternCache::new(3, 1);
        cache.get("a");
        cache.get("b");
        cache.get("c");
        cache.get("a"); // refresh: "b" is now oldest
        cache.get("d"); // overflow trims to 3 - 1 = 2
        assert!(cache.entries.contains("d"));
        assert!(cache.entries.contains("a"));
        assert!(!cache.entries.contains("b"));
    }
}
