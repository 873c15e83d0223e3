use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use us_core::mixer::SuggestionMixer;
use us_core::ports::{
    ShortcutRepositoryPort, SourceLookupPort, SuggestionReceiver, SuggestionSourcePort,
};
use us_core::{EngineConfig, SessionCache, SourceId, SourceResponse, Suggestion};

use crate::session::multiplexer::QueryMultiplexer;
use crate::session::notifier::ChangeNotifier;
use crate::session::refresher::ShortcutRefresher;

#[derive(Default)]
struct RelayState {
    cancelled: bool,
    promoted_mux: Option<QueryMultiplexer>,
    additional_mux: Option<QueryMultiplexer>,
    refresher: Option<ShortcutRefresher>,
}

/// Per-cursor bridge between the fan-out workers and the session: worker
/// completions land in the session cache and the mixer, and anything that
/// changed the mix pokes the cursor's coalesced notifier. Also owns the
/// fan-out handles so closing the cursor cancels exactly its own work.
pub struct ResultRelay {
    query: String,
    cache: Arc<SessionCache>,
    mixer: Arc<SuggestionMixer>,
    notifier: Arc<ChangeNotifier>,
    repo: Arc<dyn ShortcutRepositoryPort>,
    lookup: Arc<dyn SourceLookupPort>,
    sources_to_query: Vec<Arc<dyn SuggestionSourcePort>>,
    promoted: HashSet<SourceId>,
    shortcuts_to_refresh: Vec<Suggestion>,
    config: EngineConfig,
    state: Mutex<RelayState>,
}

impl ResultRelay {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        query: &str,
        cache: Arc<SessionCache>,
        mixer: Arc<SuggestionMixer>,
        notifier: Arc<ChangeNotifier>,
        repo: Arc<dyn ShortcutRepositoryPort>,
        lookup: Arc<dyn SourceLookupPort>,
        sources_to_query: Vec<Arc<dyn SuggestionSourcePort>>,
        promoted: HashSet<SourceId>,
        shortcuts_to_refresh: Vec<Suggestion>,
        config: EngineConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            query: query.to_string(),
            cache,
            mixer,
            notifier,
            repo,
            lookup,
            sources_to_query,
            promoted,
            shortcuts_to_refresh,
            config,
            state: Mutex::new(RelayState::default()),
        })
    }

    pub fn mixer(&self) -> &Arc<SuggestionMixer> {
        &self.mixer
    }

    /// Fires the delayed half of a keystroke: shortcut refreshes, the
    /// promoted fan-out, and a deadline wake-up so the "more results"
    /// section appears even if some promoted source never answers.
    pub fn fire(self: Arc<Self>) {
        self.clone().send_shortcut_refreshers();
        self.clone().send_promoted_queries();

        let notifier = self.notifier.clone();
        let deadline = Duration::from_millis(self.config.promoted_deadline_ms.max(0) as u64);
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            notifier.notify();
        });
    }

    fn send_shortcut_refreshers(self: Arc<Self>) {
        let mut state = self.state.lock().unwrap();
        if state.cancelled || state.refresher.is_some() {
            return;
        }
        let mut refresher = ShortcutRefresher::new(
            self.lookup.clone(),
            self.repo.clone(),
            self.shortcuts_to_refresh.clone(),
            self.config.max_results_to_display,
        );
        refresher.refresh(self.clone());
        state.refresher = Some(refresher);
    }

    fn send_promoted_queries(self: Arc<Self>) {
        let mut state = self.state.lock().unwrap();
        if state.cancelled || state.promoted_mux.is_some() {
            return;
        }
        let promoted: Vec<_> = self
            .sources_to_query
            .iter()
            .filter(|source| self.promoted.contains(&source.source_id()))
            .cloned()
            .collect();
        debug!(query = %self.query, promoted = promoted.len(), "querying promoted sources");

        self.mixer.mark_promoted_query_start();
        let mut mux = QueryMultiplexer::new(
            &self.query,
            promoted,
            self.config.max_results_per_source,
            self.config.max_results_per_source,
            self.config.source_timeout_ms,
        );
        mux.send_query(self.clone());
        state.promoted_mux = Some(mux);
    }

    /// Fans out to the sources behind the "more results" expander.
    pub fn send_additional_queries(self: Arc<Self>) {
        let mut state = self.state.lock().unwrap();
        if state.cancelled || state.additional_mux.is_some() {
            return;
        }
        let additional: Vec<_> = self
            .sources_to_query
            .iter()
            .filter(|source| !self.promoted.contains(&source.source_id()))
            .cloned()
            .collect();
        if additional.is_empty() {
            warn!(query = %self.query, "no additional sources to query");
            return;
        }
        debug!(query = %self.query, additional = additional.len(), "querying additional sources");

        let mut mux = QueryMultiplexer::new(
            &self.query,
            additional,
            self.config.max_results_to_display,
            self.config.max_results_per_source,
            self.config.source_timeout_ms,
        );
        mux.send_query(self.clone());
        state.additional_mux = Some(mux);
    }

    /// Cancels all outstanding fan-out and refresh work for this cursor.
    /// In-flight completions are discarded. Idempotent.
    pub fn cancel(&self) {
        let mut state = self.state.lock().unwrap();
        state.cancelled = true;
        if let Some(mux) = state.promoted_mux.as_mut() {
            mux.cancel();
        }
        if let Some(mux) = state.additional_mux.as_mut() {
            mux.cancel();
        }
        if let Some(refresher) = state.refresher.as_mut() {
            refresher.cancel();
        }
    }

    fn query_after_zero_results(&self, source: &SourceId) -> bool {
        self.sources_to_query
            .iter()
            .find(|s| s.source_id() == *source)
            .map(|s| s.query_after_zero_results())
            .unwrap_or(false)
    }
}

impl SuggestionReceiver for ResultRelay {
    fn on_source_query_start(&self, source: &SourceId) {
        self.mixer.report_source_started(source);
    }

    fn on_source_result(&self, response: SourceResponse) {
        self.cache.report_source_result(
            &self.query,
            response.clone(),
            self.query_after_zero_results(&response.source),
        );
        if self.mixer.add_source_result(response) {
            self.notifier.notify();
        }
    }

    fn on_shortcut_refreshed(
        &self,
        source: &SourceId,
        shortcut_id: &str,
        refreshed: Option<Suggestion>,
    ) {
        self.cache.report_refreshed_shortcut(shortcut_id);
        if self
            .mixer
            .refresh_shortcut(source, shortcut_id, refreshed.as_ref())
        {
            self.notifier.notify();
        }
    }
}
