use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use us_core::ports::{ClockPort, ShortcutRepositoryPort, SourceLookupPort, SuggestionSourcePort};
use us_core::{EngineConfig, SessionStats, SourceId};

use crate::session::cursor::SessionCursor;
use crate::session::engine::{SearchSession, SessionCallback};

struct ManagerInner {
    lookup: Arc<dyn SourceLookupPort>,
    enabled_sources: Vec<Arc<dyn SuggestionSourcePort>>,
    repo: Arc<dyn ShortcutRepositoryPort>,
    clock: Arc<dyn ClockPort>,
    config: EngineConfig,
    session: Mutex<Option<SearchSession>>,
}

/// Creates sessions on demand and reports their stats back to the
/// shortcut repository when they close. An explicit context object: hosts
/// construct one, and replace it wholesale when the source set changes.
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

impl SessionManager {
    pub fn new(
        lookup: Arc<dyn SourceLookupPort>,
        enabled_sources: Vec<Arc<dyn SuggestionSourcePort>>,
        repo: Arc<dyn ShortcutRepositoryPort>,
        clock: Arc<dyn ClockPort>,
        config: EngineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                lookup,
                enabled_sources,
                repo,
                clock,
                config,
                session: Mutex::new(None),
            }),
        }
    }

    /// Routes a keystroke to the current session, creating one first if
    /// none is open.
    pub async fn query(&self, query: &str) -> SessionCursor {
        let existing = self.inner.session.lock().unwrap().clone();
        let session = match existing {
            Some(session) => session,
            None => {
                let session = self.create_session().await;
                *self.inner.session.lock().unwrap() = Some(session.clone());
                session
            }
        };
        session.query(query).await
    }

    async fn create_session(&self) -> SearchSession {
        debug!("creating suggestion session");

        // Wake the web source up so the session's first real query hits a
        // warm path. Best effort only.
        if let Some(web) = self.inner.lookup.selected_web_source() {
            tokio::spawn(async move {
                let _ = web.suggest("", 1, 1).await;
            });
        }

        let ranking = match self.inner.repo.source_ranking().await {
            Ok(ranking) => ranking,
            Err(error) => {
                warn!(%error, "source ranking unavailable, keeping incoming order");
                Vec::new()
            }
        };
        let web_id = self.inner.lookup.selected_web_source().map(|s| s.source_id());
        let ordered = order_sources(
            &self.inner.enabled_sources,
            web_id.as_ref(),
            &ranking,
            self.inner.config.num_promoted_sources,
        );

        SearchSession::new(
            self.inner.lookup.clone(),
            ordered,
            self.inner.repo.clone(),
            self.inner.clock.clone(),
            self.inner.config.clone(),
            self.inner.clone(),
        )
    }
}

impl SessionCallback for ManagerInner {
    fn on_session_closed(&self, stats: SessionStats) {
        *self.session.lock().unwrap() = None;
        let repo = self.repo.clone();
        tokio::spawn(async move {
            if let Err(error) = repo.report_stats(&stats).await {
                warn!(%error, "failed to report session stats");
            }
        });
    }
}

/// Orders the enabled sources for a new session: the web source first,
/// then ranked sources until the promoted slots are full, then enabled
/// sources the ranking does not know (keeping their incoming order), and
/// finally the remaining ranked sources.
pub fn order_sources(
    enabled: &[Arc<dyn SuggestionSourcePort>],
    web_source: Option<&SourceId>,
    ranking: &[SourceId],
    num_promoted: usize,
) -> Vec<Arc<dyn SuggestionSourcePort>> {
    let find = |id: &SourceId| enabled.iter().find(|s| s.source_id() == *id).cloned();
    let mut ordered: Vec<Arc<dyn SuggestionSourcePort>> = Vec::with_capacity(enabled.len());
    let mut used: HashSet<SourceId> = HashSet::new();

    if let Some(web) = web_source {
        if let Some(source) = find(web) {
            used.insert(web.clone());
            ordered.push(source);
        }
    }

    for id in ranking {
        if ordered.len() >= num_promoted {
            break;
        }
        if used.contains(id) {
            continue;
        }
        if let Some(source) = find(id) {
            used.insert(id.clone());
            ordered.push(source);
        }
    }

    for source in enabled {
        let id = source.source_id();
        if !used.contains(&id) && !ranking.contains(&id) {
            used.insert(id);
            ordered.push(source.clone());
        }
    }

    for id in ranking {
        if used.contains(id) {
            continue;
        }
        if let Some(source) = find(id) {
            used.insert(id.clone());
            ordered.push(source);
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use us_core::{SourceResponse, Suggestion};

    struct NamedSource {
        id: SourceId,
    }

    #[async_trait::async_trait]
    impl SuggestionSourcePort for NamedSource {
        fn source_id(&self) -> SourceId {
            self.id.clone()
        }

        fn label(&self) -> String {
            self.id.to_string()
        }

        async fn suggest(
            &self,
            _query: &str,
            _max_results: usize,
            _query_limit: usize,
        ) -> anyhow::Result<SourceResponse> {
            Ok(SourceResponse::from_suggestions(self.id.clone(), vec![], 0))
        }

        async fn validate_shortcut(
            &self,
            _shortcut_id: &str,
        ) -> anyhow::Result<Option<Suggestion>> {
            Ok(None)
        }
    }

    fn source(id: &str) -> Arc<dyn SuggestionSourcePort> {
        Arc::new(NamedSource {
            id: SourceId::from(id),
        })
    }

    fn ids(sources: &[Arc<dyn SuggestionSourcePort>]) -> Vec<String> {
        sources.iter().map(|s| s.source_id().to_string()).collect()
    }

    fn ranking(names: &[&str]) -> Vec<SourceId> {
        names.iter().map(|n| SourceId::from(*n)).collect()
    }

    const WEB: &str = "com.example/Web";

    #[test]
    fn only_enabled_sources_are_included() {
        let enabled = vec![source(WEB), source("com.example/B")];
        let web = SourceId::from(WEB);

        let ordered = order_sources(&enabled, Some(&web), &ranking(&["com.example/C", "com.example/D", WEB]), 3);
        assert_eq!(ids(&ordered), vec![WEB, "com.example/B"]);

        let ordered = order_sources(&enabled, Some(&web), &ranking(&["com.example/C", "com.example/B", WEB]), 3);
        assert_eq!(ids(&ordered), vec![WEB, "com.example/B"]);
    }

    #[test]
    fn web_source_is_always_first() {
        let enabled: Vec<_> = [WEB, "com.example/B", "com.example/C", "com.example/D", "com.example/E", "com.example/F"]
            .iter()
            .map(|id| source(id))
            .collect();
        let web = SourceId::from(WEB);

        let ordered = order_sources(&enabled, Some(&web), &ranking(&["com.example/C", "com.example/D", WEB]), 3);
        assert_eq!(
            ids(&ordered),
            vec![WEB, "com.example/C", "com.example/D", "com.example/B", "com.example/E", "com.example/F"]
        );
    }

    #[test]
    fn unranked_sources_come_before_unpromoted_ranked_ones() {
        let enabled: Vec<_> = [WEB, "com.example/B", "com.example/C", "com.example/D", "com.example/E", "com.example/F"]
            .iter()
            .map(|id| source(id))
            .collect();
        let web = SourceId::from(WEB);

        let ordered = order_sources(
            &enabled,
            Some(&web),
            &ranking(&["com.example/C", "com.example/D", WEB, "com.example/B"]),
            3,
        );
        assert_eq!(
            ids(&ordered),
            vec![WEB, "com.example/C", "com.example/D", "com.example/E", "com.example/F", "com.example/B"]
        );
    }

    #[test]
    fn no_web_source_leaves_all_slots_to_the_ranking() {
        let enabled: Vec<_> = ["com.example/B", "com.example/C"].iter().map(|id| source(id)).collect();

        let ordered = order_sources(&enabled, None, &ranking(&["com.example/C"]), 2);
        assert_eq!(ids(&ordered), vec!["com.example/C", "com.example/B"]);
    }
}
