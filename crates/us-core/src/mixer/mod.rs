//! The ordering/mixing state machine behind each in-flight query.
//!
//! Snapshots are produced in the following order:
//! - the "go to website" entry, when the query looks like a URL
//! - shortcuts
//! - chunked round-robin results from promoted sources that reported
//!   before the promoted deadline
//! - a "search the web" entry
//! - a "more results" expander which, when expanded, is followed by one
//!   corpus entry per source with undisplayed results
//! - a pinned-to-bottom suggestion extracted from the web source, if any
//!
//! The "search the web" and "more results" entries appear only once the
//! promoted sources have had their chance to report: either they all did,
//! or the promoted deadline elapsed. A promoted source that misses the
//! deadline keeps whatever it reports out of the promoted slots and is
//! listed under "more results" instead, so already-displayed rows never
//! reshuffle.

mod source_stat;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub use source_stat::SourceStat;

use crate::ids::SourceId;
use crate::ports::{ClockPort, SuggestionSourcePort};
use crate::suggestion::{SourceResponse, Suggestion};

/// Builds the "more results" expander row.
pub trait MoreEntryFactory: Send + Sync {
    fn more_entry(&self, expanded: bool, source_stats: &[SourceStat]) -> Suggestion;
}

/// Builds one row standing for a source under "more results".
pub trait CorpusEntryFactory: Send + Sync {
    fn corpus_entry(&self, stat: &SourceStat) -> Suggestion;
}

/// Constructor inputs for [`SuggestionMixer`].
pub struct MixerParams {
    pub shortcuts: Vec<Suggestion>,
    pub sources: Vec<Arc<dyn SuggestionSourcePort>>,
    pub promoted_sources: HashSet<SourceId>,
    pub web_source: Option<SourceId>,
    pub go_to_website: Option<Suggestion>,
    pub search_the_web: Option<Suggestion>,
    pub max_promoted_slots: usize,
    pub promoted_deadline_ms: i64,
    pub more_factory: Arc<dyn MoreEntryFactory>,
    pub corpus_factory: Arc<dyn CorpusEntryFactory>,
    pub clock: Arc<dyn ClockPort>,
}

struct MixerState {
    shortcuts: Vec<Suggestion>,
    sources: Vec<Arc<dyn SuggestionSourcePort>>,
    promoted: HashSet<SourceId>,
    /// Responses in first-report order.
    reported: Vec<(SourceId, SourceResponse)>,
    reported_before_deadline: HashSet<SourceId>,
    started: HashSet<SourceId>,
    pin_to_bottom: Option<Suggestion>,
    promoted_query_start_ms: i64,
    showing_more: bool,
    more_index: usize,
}

impl MixerState {
    fn reported_response(&self, source: &SourceId) -> Option<&SourceResponse> {
        self.reported
            .iter()
            .find(|(id, _)| id == source)
            .map(|(_, r)| r)
    }
}

/// Holds the current view of an in-flight query and materializes stable,
/// de-duplicated snapshots as partial results stream in. All operations
/// serialize on one internal lock; snapshots are copies.
pub struct SuggestionMixer {
    state: Mutex<MixerState>,
    web_source: Option<SourceId>,
    go_to_website: Option<Suggestion>,
    search_the_web: Option<Suggestion>,
    max_promoted_slots: usize,
    promoted_deadline_ms: i64,
    more_factory: Arc<dyn MoreEntryFactory>,
    corpus_factory: Arc<dyn CorpusEntryFactory>,
    clock: Arc<dyn ClockPort>,
}

impl SuggestionMixer {
    pub fn new(params: MixerParams) -> Self {
        assert!(
            params.promoted_sources.len() <= params.max_promoted_slots,
            "more promoted sources than there are slots"
        );

        let now = params.clock.now_ms();
        Self {
            state: Mutex::new(MixerState {
                shortcuts: params.shortcuts,
                sources: params.sources,
                promoted: params.promoted_sources,
                reported: Vec::new(),
                reported_before_deadline: HashSet::new(),
                started: HashSet::new(),
                pin_to_bottom: None,
                promoted_query_start_ms: now,
                showing_more: false,
                more_index: 0,
            }),
            web_source: params.web_source,
            go_to_website: params.go_to_website,
            search_the_web: params.search_the_web,
            max_promoted_slots: params.max_promoted_slots,
            promoted_deadline_ms: params.promoted_deadline_ms,
            more_factory: params.more_factory,
            corpus_factory: params.corpus_factory,
            clock: params.clock,
        }
    }

    /// Restarts the promoted deadline. Needed when the mixer is built
    /// ahead of a delayed fan-out.
    pub fn mark_promoted_query_start(&self) {
        self.state.lock().unwrap().promoted_query_start_ms = self.clock.now_ms();
    }

    /// Records that a source's query task has begun running.
    pub fn report_source_started(&self, source: &SourceId) {
        self.state.lock().unwrap().started.insert(source.clone());
    }

    pub fn has_source_started(&self, source: &SourceId) -> bool {
        self.state.lock().unwrap().started.contains(source)
    }

    /// Installs a response that arrived through the session cache rather
    /// than the fan-out: the source joins the expected set (promoted if it
    /// would have been) and its rows mix in as if freshly reported.
    pub fn add_cached_result(
        &self,
        source: Arc<dyn SuggestionSourcePort>,
        response: SourceResponse,
        promoted: bool,
    ) -> bool {
        {
            let mut state = self.state.lock().unwrap();
            let id = source.source_id();
            state.sources.push(source);
            if promoted {
                state.promoted.insert(id);
            }
        }
        self.add_source_result(response)
    }

    /// Folds one response in. Returns whether the UI should re-snapshot:
    /// true past the deadline (the "more" section may change) or whenever
    /// the response carries rows.
    pub fn add_source_result(&self, mut response: SourceResponse) -> bool {
        let mut state = self.state.lock().unwrap();

        // The web source may pin its last suggestion to the very bottom of
        // the list; detach it so mixing never reorders it.
        if self.web_source.as_ref() == Some(&response.source) {
            if response.suggestions.last().is_some_and(|s| s.pin_to_bottom) {
                state.pin_to_bottom = response.suggestions.pop();
            }
        }

        let past_deadline = self.is_past_deadline(&state);
        if !past_deadline {
            state.reported_before_deadline.insert(response.source.clone());
        }
        let has_rows = !response.suggestions.is_empty();

        match state
            .reported
            .iter_mut()
            .find(|(id, _)| *id == response.source)
        {
            Some(slot) => slot.1 = response,
            None => state.reported.push((response.source.clone(), response)),
        }

        past_deadline || has_rows
    }

    /// Replaces a displayed shortcut in place after revalidation. The
    /// removal case is handled by the repository; a vanished shortcut
    /// simply stays until the next keystroke.
    pub fn refresh_shortcut(
        &self,
        _source: &SourceId,
        shortcut_id: &str,
        refreshed: Option<&Suggestion>,
    ) -> bool {
        let Some(refreshed) = refreshed else {
            return false;
        };
        let mut state = self.state.lock().unwrap();
        for shortcut in state.shortcuts.iter_mut() {
            if shortcut.shortcut_id.as_deref() == Some(shortcut_id) {
                *shortcut = refreshed.clone();
                return true;
            }
        }
        false
    }

    /// Whether promoted sources are still expected to report.
    pub fn is_results_pending(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.reported.len() < state.promoted.len()
    }

    /// Whether the last snapshot included the "more results" section.
    pub fn is_showing_more(&self) -> bool {
        self.state.lock().unwrap().showing_more
    }

    /// Index of the "more results" row in the last snapshot. Only
    /// meaningful while [`is_showing_more`](Self::is_showing_more) holds.
    pub fn more_result_position(&self) -> usize {
        self.state.lock().unwrap().more_index
    }

    /// Materializes the current mix into `dest`.
    pub fn snapshot_into(&self, dest: &mut Vec<Suggestion>, expand_more: bool) {
        let mut state = self.state.lock().unwrap();
        let more_index = self.snapshot_locked(&mut state, dest, expand_more);
        state.more_index = more_index;
    }

    fn is_past_deadline(&self, state: &MixerState) -> bool {
        self.clock.now_ms() - state.promoted_query_start_ms >= self.promoted_deadline_ms
    }

    /// Returns the index of the "more results" row, or `dest.len()` when
    /// there is none, so the index is never a valid row in that case.
    fn snapshot_locked(
        &self,
        state: &mut MixerState,
        dest: &mut Vec<Suggestion>,
        expand_more: bool,
    ) -> usize {
        dest.clear();

        if let Some(go_to_website) = &self.go_to_website {
            dest.push(go_to_website.clone());
        }
        dest.extend(state.shortcuts.iter().cloned());

        // Derived fresh each snapshot: a refreshed shortcut may carry a
        // different identity than the one it replaced.
        let shortcut_keys: HashSet<String> =
            state.shortcuts.iter().map(|s| s.dedup_key()).collect();

        let promoted_slots_available =
            self.max_promoted_slots.saturating_sub(state.shortcuts.len());
        let chunk_size = if state.promoted.is_empty() {
            0
        } else {
            (promoted_slots_available / state.promoted.len()).max(1)
        };

        // Feeds over promoted sources that reported in time, each a
        // (reported-index, next-row) pair.
        let mut feeds: Vec<(usize, usize)> = state
            .reported
            .iter()
            .enumerate()
            .filter(|(_, (id, response))| {
                state.promoted.contains(id)
                    && state.reported_before_deadline.contains(id)
                    && !response.suggestions.is_empty()
            })
            .map(|(index, _)| (index, 0))
            .collect();

        let mut displayed_per_source: HashMap<SourceId, usize> = HashMap::new();
        let mut slots_used = 0usize;

        for feed in feeds.iter_mut() {
            for _ in 0..chunk_size {
                let Some(suggestion) = state.reported[feed.0].1.suggestions.get(feed.1) else {
                    break;
                };
                feed.1 += 1;
                if !shortcut_keys.contains(&suggestion.dedup_key()) {
                    *displayed_per_source
                        .entry(suggestion.source.clone())
                        .or_insert(0) += 1;
                    dest.push(suggestion.clone());
                    slots_used += 1;
                }
            }
        }

        let past_deadline = self.is_past_deadline(state);
        let all_promoted_reported = state.reported.len() >= state.promoted.len();
        state.showing_more =
            (past_deadline || all_promoted_reported) && !state.sources.is_empty();
        if !state.showing_more {
            return dest.len();
        }

        // Second pass: spend what is left of the promoted slots on the
        // same feeds, pruned of exhausted ones.
        feeds.retain(|(index, pos)| *pos < state.reported[*index].1.suggestions.len());
        let mut slots_remaining = promoted_slots_available as isize - slots_used as isize;
        let new_chunk = if feeds.is_empty() {
            0
        } else {
            (slots_remaining.max(0) as usize / feeds.len()).max(1)
        };
        for feed in feeds.iter_mut() {
            if slots_remaining <= 0 {
                break;
            }
            let mut taken = 0;
            while taken < new_chunk && slots_remaining > 0 {
                let Some(suggestion) = state.reported[feed.0].1.suggestions.get(feed.1) else {
                    break;
                };
                feed.1 += 1;
                taken += 1;
                if !shortcut_keys.contains(&suggestion.dedup_key()) {
                    *displayed_per_source
                        .entry(suggestion.source.clone())
                        .or_insert(0) += 1;
                    dest.push(suggestion.clone());
                    slots_remaining -= 1;
                }
            }
        }

        let more_sources = self.gather_source_stats(state, &displayed_per_source);

        if let Some(search_the_web) = &self.search_the_web {
            dest.push(search_the_web.clone());
        }

        let index_of_more = dest.len();
        if !more_sources.is_empty() {
            dest.push(self.more_factory.more_entry(expand_more, &more_sources));
            if expand_more {
                for stat in &more_sources {
                    dest.push(self.corpus_factory.corpus_entry(stat));
                }
            }
        }

        if let Some(pinned) = &state.pin_to_bottom {
            dest.push(pinned.clone());
        }

        index_of_more
    }

    /// Per-source stats backing the "more results" section.
    fn gather_source_stats(
        &self,
        state: &MixerState,
        displayed_per_source: &HashMap<SourceId, usize>,
    ) -> Vec<SourceStat> {
        let mut stats = Vec::new();
        for source in &state.sources {
            let id = source.source_id();
            let promoted = state.promoted.contains(&id);
            let before_deadline = state.reported_before_deadline.contains(&id);

            let Some(response) = state.reported_response(&id) else {
                stats.push(SourceStat {
                    source: id,
                    promoted,
                    label: source.label(),
                    icon: source.icon(),
                    responded: false,
                    num_results: 0,
                    query_limit: 0,
                });
                continue;
            };

            if before_deadline && promoted {
                // Mixed into the promoted slots; listed only when rows
                // remain undisplayed.
                let displayed = displayed_per_source.get(&id).copied().unwrap_or(0);
                if displayed < response.suggestions.len() {
                    let mut num_results = response.count.saturating_sub(displayed);
                    let mut query_limit = response.query_limit.saturating_sub(displayed);
                    if state.pin_to_bottom.is_some() && self.web_source.as_ref() == Some(&id) {
                        num_results = num_results.saturating_sub(1);
                        query_limit = query_limit.saturating_sub(1);
                    }
                    stats.push(SourceStat {
                        source: id,
                        promoted: true,
                        label: source.label(),
                        icon: source.icon(),
                        responded: true,
                        num_results,
                        query_limit,
                    });
                }
            } else {
                stats.push(SourceStat {
                    source: id,
                    promoted: false,
                    label: source.label(),
                    icon: source.icon(),
                    responded: true,
                    num_results: response.count,
                    query_limit: response.query_limit,
                });
            }
        }
        stats
    }
}
