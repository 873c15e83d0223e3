use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tracing::{debug, warn};

use us_core::mixer::{MixerParams, SuggestionMixer};
use us_core::ports::{ClockPort, ShortcutRepositoryPort, SourceLookupPort, SuggestionSourcePort};
use us_core::suggestion::{actions, SuggestionViewFactory};
use us_core::{EngineConfig, SessionCache, SessionId, SessionStats, SourceId, Suggestion};

use crate::session::cursor::{CursorListener, SessionCursor};
use crate::session::notifier::ChangeNotifier;
use crate::session::relay::ResultRelay;
use crate::session::task::CancellableTask;

/// Receives the stats of a session once its last cursor has closed.
pub trait SessionCallback: Send + Sync {
    fn on_session_closed(&self, stats: SessionStats);
}

struct SessionState {
    last_key_ms: Option<i64>,
    last_last_key_ms: Option<i64>,
    current_query: String,
    previous_cursor: Option<SessionCursor>,
    outstanding: i32,
    impressions: HashSet<SourceId>,
    clicked: Option<Suggestion>,
    pending_fire: Option<CancellableTask>,
}

struct SessionInner {
    id: SessionId,
    lookup: Arc<dyn SourceLookupPort>,
    enabled_sources: Vec<Arc<dyn SuggestionSourcePort>>,
    enabled_ids: HashSet<SourceId>,
    repo: Arc<dyn ShortcutRepositoryPort>,
    clock: Arc<dyn ClockPort>,
    config: EngineConfig,
    callback: Arc<dyn SessionCallback>,
    cache: Arc<SessionCache>,
    state: Mutex<SessionState>,
}

/// One typing session: lives from the first keystroke in a search box
/// until the last cursor it produced closes.
///
/// Per keystroke it assembles a cursor from shortcuts and cached results,
/// decides which sources still need querying, and defers the fan-out while
/// the user is typing steadily so a canceled keystroke costs nothing.
/// Within one session no source is queried twice for the same query, and a
/// source that returned nothing for a prefix is not asked about supersets
/// unless it opted in.
#[derive(Clone)]
pub struct SearchSession {
    inner: Arc<SessionInner>,
}

impl SearchSession {
    pub fn new(
        lookup: Arc<dyn SourceLookupPort>,
        enabled_sources: Vec<Arc<dyn SuggestionSourcePort>>,
        repo: Arc<dyn ShortcutRepositoryPort>,
        clock: Arc<dyn ClockPort>,
        config: EngineConfig,
        callback: Arc<dyn SessionCallback>,
    ) -> Self {
        let enabled_ids = enabled_sources.iter().map(|s| s.source_id()).collect();
        let cache = Arc::new(SessionCache::new(config.max_cached_queries));
        Self {
            inner: Arc::new(SessionInner {
                id: SessionId::new(),
                lookup,
                enabled_sources,
                enabled_ids,
                repo,
                clock,
                config,
                callback,
                cache,
                state: Mutex::new(SessionState {
                    last_key_ms: None,
                    last_last_key_ms: None,
                    current_query: String::new(),
                    previous_cursor: None,
                    outstanding: 0,
                    impressions: HashSet::new(),
                    clicked: None,
                    pending_fire: None,
                }),
            }),
        }
    }

    /// Handles one keystroke, returning a cursor that will be refreshed as
    /// results stream in.
    pub async fn query(&self, query: &str) -> SessionCursor {
        let inner = &self.inner;

        let delay_ms = {
            let mut state = inner.state.lock().unwrap();
            state.outstanding += 1;
            state.current_query = query.to_string();
            if let Some(pending) = state.pending_fire.take() {
                if pending.cancel() {
                    // The delayed fan-out never ran; give its count back.
                    state.outstanding -= 1;
                }
            }
            let now = inner.clock.now_ms();
            let delay = recommended_delay(&state, now, &inner.config);
            state.last_last_key_ms = state.last_key_ms;
            state.last_key_ms = Some(now);
            delay
        };
        debug!(session_id = %inner.id, query, delay_ms, "keystroke");

        let shortcuts: Vec<Suggestion> = match inner.repo.shortcuts_for_query(query).await {
            Ok(shortcuts) => shortcuts
                .into_iter()
                .filter(|s| inner.enabled_ids.contains(&s.source))
                .collect(),
            Err(error) => {
                warn!(session_id = %inner.id, %error, "shortcut lookup failed");
                Vec::new()
            }
        };

        let relevant = inner.filter_sources_for_query(query);
        let promoted_ids: HashSet<SourceId> = relevant
            .iter()
            .take(inner.config.num_promoted_sources)
            .map(|s| s.source_id())
            .collect();
        let cached = inner.cache.source_results(query);
        let sources_to_query: Vec<Arc<dyn SuggestionSourcePort>> = relevant
            .iter()
            .filter(|s| cached.get(&s.source_id()).is_none())
            .cloned()
            .collect();
        debug!(
            session_id = %inner.id,
            relevant = relevant.len(),
            cached = cached.len(),
            to_query = sources_to_query.len(),
            shortcuts = shortcuts.len(),
            "cursor inputs"
        );

        let factory = Arc::new(SuggestionViewFactory::new(query));
        let web_source_id = inner.lookup.selected_web_source().map(|s| s.source_id());
        let uncached_promoted: HashSet<SourceId> = sources_to_query
            .iter()
            .map(|s| s.source_id())
            .filter(|id| promoted_ids.contains(id))
            .collect();
        let mixer = Arc::new(SuggestionMixer::new(MixerParams {
            shortcuts: shortcuts.clone(),
            sources: sources_to_query.clone(),
            promoted_sources: uncached_promoted,
            web_source: web_source_id,
            go_to_website: factory.go_to_website(),
            search_the_web: factory.search_the_web(),
            max_promoted_slots: inner.config.max_results_to_display,
            promoted_deadline_ms: inner.config.promoted_deadline_ms,
            more_factory: factory.clone(),
            corpus_factory: factory.clone(),
            clock: inner.clock.clone(),
        }));

        // Cached responses join the mix before any fan-out begins, so a
        // repeated query renders instantly.
        for response in cached.iter() {
            if let Some(source) = relevant.iter().find(|s| s.source_id() == response.source) {
                mixer.add_cached_result(
                    source.clone(),
                    response.clone(),
                    promoted_ids.contains(&response.source),
                );
            }
        }

        let shortcuts_to_refresh: Vec<Suggestion> = shortcuts
            .iter()
            .filter(|s| match &s.shortcut_id {
                Some(id) => !inner.cache.has_shortcut_been_refreshed(&s.source, id),
                None => false,
            })
            .cloned()
            .collect();

        let notifier = ChangeNotifier::new(inner.clock.clone(), inner.config.cursor_notify_window_ms);
        let relay = ResultRelay::new(
            query,
            inner.cache.clone(),
            mixer.clone(),
            notifier.clone(),
            inner.repo.clone(),
            inner.lookup.clone(),
            sources_to_query,
            promoted_ids,
            shortcuts_to_refresh,
            inner.config.clone(),
        );

        let cursor = SessionCursor::new(query, mixer, notifier.clone());
        // The session holds its cursors (for prefill), so the hooks hold
        // the session weakly.
        cursor.set_listener(Arc::new(CursorHooks {
            session: Arc::downgrade(inner),
            relay: relay.clone(),
        }));

        {
            let mut state = inner.state.lock().unwrap();
            if delay_ms > 0 {
                // The pending fan-out holds an outstanding count of its
                // own so the session cannot close underneath it; either
                // the task body or a winning cancel gives it back.
                state.outstanding += 1;
                let relay = relay.clone();
                let session = inner.clone();
                state.pending_fire = Some(CancellableTask::spawn_delayed(
                    Duration::from_millis(delay_ms as u64),
                    async move {
                        relay.fire();
                        session.decrement_outstanding();
                    },
                ));
            } else {
                relay.clone().fire();
            }

            // A cursor with nothing to show yet keeps the previous rows on
            // screen briefly, to cut flicker between keystrokes.
            if cursor.count() == 0 {
                if let Some(previous) = &state.previous_cursor {
                    if previous.count() > 0 {
                        cursor.prefill(previous);
                        let notifier = notifier.clone();
                        let prefill = Duration::from_millis(inner.config.prefill_ms);
                        tokio::spawn(async move {
                            tokio::time::sleep(prefill).await;
                            notifier.notify();
                        });
                    }
                }
            }
            state.previous_cursor = Some(cursor.clone());
        }

        cursor
    }
}

impl SessionInner {
    /// Drops sources that cannot contribute to this query: too-short
    /// queries, and sources that already proved empty for a prefix.
    fn filter_sources_for_query(&self, query: &str) -> Vec<Arc<dyn SuggestionSourcePort>> {
        let query_len = query.chars().count();
        if query_len == 0 {
            return Vec::new();
        }
        let cutoff = query_len.max(1);
        self.enabled_sources
            .iter()
            .filter(|source| {
                if source.query_threshold() > cutoff {
                    return false;
                }
                if !source.query_after_zero_results()
                    && self
                        .cache
                        .has_reported_zero_results_for_prefix(query, &source.source_id())
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect()
    }

    fn decrement_outstanding(&self) {
        let stats = {
            let mut state = self.state.lock().unwrap();
            state.outstanding -= 1;
            if state.outstanding > 0 {
                return;
            }
            SessionStats::new(
                state.current_query.clone(),
                state.clicked.take(),
                std::mem::take(&mut state.impressions),
            )
        };
        debug!(session_id = %self.id, query = %stats.query, "session closed");
        self.callback.on_session_closed(stats);
    }
}

/// How long to sit on a keystroke before querying sources, so that steady
/// typing cancels a fan-out before any source is contacted. With three
/// recent keystrokes the average of the last two gaps decides; with two,
/// just the latest gap; a first keystroke fires immediately.
fn recommended_delay(state: &SessionState, now: i64, config: &EngineConfig) -> i64 {
    let Some(last) = state.last_key_ms else {
        return 0;
    };
    let latest_gap = now - last;
    if let Some(last_last) = state.last_last_key_ms {
        let previous_gap = last - last_last;
        if (latest_gap + previous_gap) / 2 < config.typing_delay_last_three_ms {
            return config.typing_delay_last_three_ms;
        }
    }
    if latest_gap < config.typing_delay_last_two_ms {
        return config.typing_delay_last_two_ms;
    }
    0
}

/// Feeds cursor events back into the owning session.
struct CursorHooks {
    session: Weak<SessionInner>,
    relay: Arc<ResultRelay>,
}

impl CursorListener for CursorHooks {
    fn on_item_clicked(&self, clicked: &Suggestion) {
        if let Some(session) = self.session.upgrade() {
            session.state.lock().unwrap().clicked = Some(clicked.clone());
        }
    }

    fn on_more_visible(&self) {
        self.relay.clone().send_additional_queries();
    }

    fn on_close(&self, viewed: Vec<Suggestion>) {
        self.relay.cancel();
        let Some(session) = self.session.upgrade() else {
            return;
        };
        {
            let mut state = session.state.lock().unwrap();
            for suggestion in viewed {
                if suggestion.intent_action.as_deref() == Some(actions::ACTION_CHANGE_SOURCE) {
                    // A viewed corpus entry only counts against its source
                    // once that source actually started running.
                    if let Some(data) = &suggestion.intent_data {
                        let id = SourceId::from(data.as_str());
                        if self.relay.mixer().has_source_started(&id) {
                            state.impressions.insert(id);
                        }
                    }
                } else if session.lookup.source_by_id(&suggestion.source).is_some() {
                    state.impressions.insert(suggestion.source.clone());
                }
            }
        }
        session.decrement_outstanding();
    }
}
