use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use crate::ids::SourceId;
use crate::suggestion::SourceResponse;

/// Results the sources have reported for one query, preserving report
/// order and allowing per-source lookup.
#[derive(Debug, Clone, Default)]
pub struct QueryResults {
    entries: Vec<(SourceId, SourceResponse)>,
}

impl QueryResults {
    pub fn add(&mut self, response: SourceResponse) {
        match self.entries.iter_mut().find(|(id, _)| *id == response.source) {
            Some(slot) => slot.1 = response,
            None => self.entries.push((response.source.clone(), response)),
        }
    }

    pub fn get(&self, source: &SourceId) -> Option<&SourceResponse> {
        self.entries
            .iter()
            .find(|(id, _)| id == source)
            .map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceResponse> {
        self.entries.iter().map(|(_, r)| r)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Default)]
struct CacheState {
    zero_result_sources: HashMap<String, HashSet<SourceId>>,
    results: HashMap<String, QueryResults>,
    insertion_order: VecDeque<String>,
    refreshed_shortcuts: HashSet<String>,
}

/// Intra-session memory that keeps the engine from repeating work:
/// - no source is queried twice for the same query,
/// - no shortcut is validated twice,
/// - a source that returned zero results for a prefix is not asked about
///   supersets (unless it opted back in).
///
/// The per-query result sets are advisory: the cache holds at most
/// `max_cached_queries` of them, evicting the oldest, and an evicted entry
/// is simply a miss that forces a re-query.
#[derive(Debug)]
pub struct SessionCache {
    state: Mutex<CacheState>,
    max_cached_queries: usize,
}

impl SessionCache {
    pub fn new(max_cached_queries: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_cached_queries: max_cached_queries.max(1),
        }
    }

    /// Whether `source` reported zero results for any strict prefix of
    /// `query` during this session.
    pub fn has_reported_zero_results_for_prefix(&self, query: &str, source: &SourceId) -> bool {
        let state = self.state.lock().unwrap();
        for (end, _) in query.char_indices() {
            if end == 0 {
                continue;
            }
            if let Some(zeros) = state.zero_result_sources.get(&query[..end]) {
                if zeros.contains(source) {
                    return true;
                }
            }
        }
        false
    }

    pub fn has_shortcut_been_refreshed(&self, _source: &SourceId, shortcut_id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .refreshed_shortcuts
            .contains(shortcut_id)
    }

    /// The responses cached for `query`; empty if nothing was cached or
    /// the entry was evicted.
    pub fn source_results(&self, query: &str) -> QueryResults {
        self.state
            .lock()
            .unwrap()
            .results
            .get(query)
            .cloned()
            .unwrap_or_default()
    }

    /// Records one source's response for `query`. Error responses are not
    /// cached, so a later keystroke may retry the source.
    pub fn report_source_result(
        &self,
        query: &str,
        response: SourceResponse,
        query_after_zero_results: bool,
    ) {
        if response.is_error() {
            return;
        }
        let mut state = self.state.lock().unwrap();

        if !query_after_zero_results && response.is_empty() {
            state
                .zero_result_sources
                .entry(query.to_string())
                .or_default()
                .insert(response.source.clone());
        }

        if !state.results.contains_key(query) {
            if state.results.len() >= self.max_cached_queries {
                if let Some(evicted) = state.insertion_order.pop_front() {
                    state.results.remove(&evicted);
                }
            }
            state.insertion_order.push_back(query.to_string());
        }
        state
            .results
            .entry(query.to_string())
            .or_default()
            .add(response);
    }

    pub fn report_refreshed_shortcut(&self, shortcut_id: &str) {
        self.state
            .lock()
            .unwrap()
            .refreshed_shortcuts
            .insert(shortcut_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestion::Suggestion;

    fn response(source: &str, titles: &[&str]) -> SourceResponse {
        let suggestions = titles
            .iter()
            .map(|t| Suggestion::builder(source).title(*t).build())
            .collect();
        SourceResponse::from_suggestions(source, suggestions, 50)
    }

    #[test]
    fn zero_results_for_prefix_blocks_supersets() {
        let cache = SessionCache::new(8);
        let source = SourceId::from("pkg/App");
        cache.report_source_result("yo", response("pkg/App", &[]), false);

        assert!(cache.has_reported_zero_results_for_prefix("yo man", &source));
        // The query itself is not a strict prefix.
        assert!(!cache.has_reported_zero_results_for_prefix("yo", &source));
        assert!(!cache.has_reported_zero_results_for_prefix("ya", &source));
    }

    #[test]
    fn opted_in_sources_are_not_blocked() {
        let cache = SessionCache::new(8);
        let source = SourceId::from("pkg/App");
        cache.report_source_result("yo", response("pkg/App", &[]), true);
        assert!(!cache.has_reported_zero_results_for_prefix("yo man", &source));
    }

    #[test]
    fn prefix_walk_respects_multibyte_boundaries() {
        let cache = SessionCache::new(8);
        let source = SourceId::from("pkg/App");
        cache.report_source_result("\u{00E9}t", response("pkg/App", &[]), false);
        assert!(cache.has_reported_zero_results_for_prefix("\u{00E9}t\u{00E9}", &source));
    }

    #[test]
    fn results_round_trip_and_replace() {
        let cache = SessionCache::new(8);
        cache.report_source_result("a", response("pkg/App", &["one"]), false);
        cache.report_source_result("a", response("pkg/Other", &["two"]), false);
        cache.report_source_result("a", response("pkg/App", &["three"]), false);

        let results = cache.source_results("a");
        assert_eq!(results.len(), 2);
        let titles: Vec<&str> = results
            .iter()
            .flat_map(|r| r.suggestions.iter().map(|s| s.title.as_str()))
            .collect();
        assert_eq!(titles, vec!["three", "two"]);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = SessionCache::new(8);
        let source = SourceId::from("pkg/App");
        cache.report_source_result("a", SourceResponse::empty_error("pkg/App"), false);
        assert!(cache.source_results("a").is_empty());
        assert!(!cache.has_reported_zero_results_for_prefix("ab", &source));
    }

    #[test]
    fn oldest_query_is_evicted_at_capacity() {
        let cache = SessionCache::new(2);
        cache.report_source_result("a", response("pkg/App", &["one"]), false);
        cache.report_source_result("ab", response("pkg/App", &["two"]), false);
        cache.report_source_result("abc", response("pkg/App", &["three"]), false);

        assert!(cache.source_results("a").is_empty());
        assert!(!cache.source_results("ab").is_empty());
        assert!(!cache.source_results("abc").is_empty());
    }

    #[test]
    fn refreshed_shortcuts_are_remembered() {
        let cache = SessionCache::new(8);
        let source = SourceId::from("pkg/App");
        assert!(!cache.has_shortcut_been_refreshed(&source, "s1"));
        cache.report_refreshed_shortcut("s1");
        assert!(cache.has_shortcut_been_refreshed(&source, "s1"));
    }
}
