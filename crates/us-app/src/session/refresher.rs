use std::sync::Arc;

use tokio::task::AbortHandle;
use tracing::{debug, error};

use us_core::ports::{
    ShortcutRepositoryPort, SourceLookupPort, SuggestionReceiver, SuggestionSourcePort,
};
use us_core::{SourceId, Suggestion};

/// Revalidates displayed shortcuts against their originating sources,
/// updating the repository and notifying the receiver with the outcome.
/// A shortcut whose source can no longer be resolved is invalidated.
pub struct ShortcutRefresher {
    lookup: Arc<dyn SourceLookupPort>,
    repo: Arc<dyn ShortcutRepositoryPort>,
    shortcuts: Vec<Suggestion>,
    max_to_refresh: usize,
    sent: Vec<AbortHandle>,
}

impl ShortcutRefresher {
    pub fn new(
        lookup: Arc<dyn SourceLookupPort>,
        repo: Arc<dyn ShortcutRepositoryPort>,
        shortcuts: Vec<Suggestion>,
        max_to_refresh: usize,
    ) -> Self {
        Self {
            lookup,
            repo,
            shortcuts,
            max_to_refresh,
            sent: Vec::new(),
        }
    }

    /// Schedules one refresh task per shortcut, up to the configured cap.
    /// The receiver is handed to the tasks rather than kept, so a receiver
    /// that owns this refresher does not keep itself alive.
    pub fn refresh(&mut self, receiver: Arc<dyn SuggestionReceiver>) {
        let count = self.max_to_refresh.min(self.shortcuts.len());
        debug!(count, "sending shortcut refresh tasks");
        for shortcut in self.shortcuts.iter().take(count) {
            let Some(shortcut_id) = shortcut.shortcut_id.clone() else {
                continue;
            };
            let source_id = shortcut.source.clone();
            let source = self.lookup.source_by_id(&source_id);
            let handle = tokio::spawn(run_refresh(
                source,
                source_id,
                shortcut_id,
                self.repo.clone(),
                receiver.clone(),
            ));
            self.sent.push(handle.abort_handle());
        }
    }

    /// Aborts every outstanding refresh task.
    pub fn cancel(&mut self) {
        for handle in &self.sent {
            handle.abort();
        }
    }
}

async fn run_refresh(
    source: Option<Arc<dyn SuggestionSourcePort>>,
    source_id: SourceId,
    shortcut_id: String,
    repo: Arc<dyn ShortcutRepositoryPort>,
    receiver: Arc<dyn SuggestionReceiver>,
) {
    let refreshed = match &source {
        // The source is gone; the shortcut has nothing to validate against.
        None => None,
        Some(source) => match source.validate_shortcut(&shortcut_id).await {
            Ok(refreshed) => refreshed,
            Err(error) => {
                error!(source = %source_id, shortcut_id, %error, "shortcut refresh failed");
                return;
            }
        },
    };

    if let Err(error) = repo
        .refresh_shortcut(&source_id, &shortcut_id, refreshed.as_ref())
        .await
    {
        error!(source = %source_id, shortcut_id, %error, "failed to persist shortcut refresh");
    }
    receiver.on_shortcut_refreshed(&source_id, &shortcut_id, refreshed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use us_core::{SessionStats, SourceResponse};

    struct StaticLookup {
        sources: Vec<Arc<dyn SuggestionSourcePort>>,
    }

    impl SourceLookupPort for StaticLookup {
        fn source_by_id(&self, id: &SourceId) -> Option<Arc<dyn SuggestionSourcePort>> {
            self.sources
                .iter()
                .find(|s| s.source_id() == *id)
                .cloned()
        }

        fn selected_web_source(&self) -> Option<Arc<dyn SuggestionSourcePort>> {
            None
        }
    }

    struct ValidatingSource {
        id: SourceId,
        answer: Option<Suggestion>,
    }

    #[async_trait::async_trait]
    impl SuggestionSourcePort for ValidatingSource {
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
            Ok(self.answer.clone())
        }
    }

    #[derive(Default)]
    struct RecordingRepo {
        refreshes: Mutex<Vec<(SourceId, String, bool)>>,
    }

    #[async_trait::async_trait]
    impl ShortcutRepositoryPort for RecordingRepo {
        async fn has_history(&self) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn clear_history(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn report_stats(&self, _stats: &SessionStats) -> anyhow::Result<()> {
            Ok(())
        }

        async fn shortcuts_for_query(&self, _query: &str) -> anyhow::Result<Vec<Suggestion>> {
            Ok(vec![])
        }

        async fn source_ranking(&self) -> anyhow::Result<Vec<SourceId>> {
            Ok(vec![])
        }

        async fn refresh_shortcut(
            &self,
            source: &SourceId,
            shortcut_id: &str,
            refreshed: Option<&Suggestion>,
        ) -> anyhow::Result<()> {
            self.refreshes.lock().unwrap().push((
                source.clone(),
                shortcut_id.to_string(),
                refreshed.is_some(),
            ));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingReceiver {
        refreshed: Mutex<Vec<(String, bool)>>,
    }

    impl SuggestionReceiver for RecordingReceiver {
        fn on_source_query_start(&self, _source: &SourceId) {}

        fn on_source_result(&self, _response: SourceResponse) {}

        fn on_shortcut_refreshed(
            &self,
            _source: &SourceId,
            shortcut_id: &str,
            refreshed: Option<Suggestion>,
        ) {
            self.refreshed
                .lock()
                .unwrap()
                .push((shortcut_id.to_string(), refreshed.is_some()));
        }
    }

    fn shortcut(source: &str, id: &str) -> Suggestion {
        Suggestion::builder(source)
            .title(format!("shortcut {id}"))
            .shortcut_id(id)
            .build()
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn validated_shortcut_updates_repo_and_receiver() {
        let id = SourceId::from("pkg/A");
        let refreshed = Suggestion::builder("pkg/A")
            .title("fresh")
            .shortcut_id("s1")
            .build();
        let lookup = Arc::new(StaticLookup {
            sources: vec![Arc::new(ValidatingSource {
                id: id.clone(),
                answer: Some(refreshed),
            })],
        });
        let repo = Arc::new(RecordingRepo::default());
        let receiver = Arc::new(RecordingReceiver::default());

        let mut refresher = ShortcutRefresher::new(
            lookup,
            repo.clone(),
            vec![shortcut("pkg/A", "s1")],
            7,
        );
        refresher.refresh(receiver.clone());
        settle().await;

        assert_eq!(
            repo.refreshes.lock().unwrap().clone(),
            vec![(id, "s1".to_string(), true)]
        );
        assert_eq!(
            receiver.refreshed.lock().unwrap().clone(),
            vec![("s1".to_string(), true)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unresolvable_source_invalidates_shortcut() {
        let lookup = Arc::new(StaticLookup { sources: vec![] });
        let repo = Arc::new(RecordingRepo::default());
        let receiver = Arc::new(RecordingReceiver::default());

        let mut refresher = ShortcutRefresher::new(
            lookup,
            repo.clone(),
            vec![shortcut("pkg/Gone", "s2")],
            7,
        );
        refresher.refresh(receiver.clone());
        settle().await;

        assert_eq!(
            repo.refreshes.lock().unwrap().clone(),
            vec![(SourceId::from("pkg/Gone"), "s2".to_string(), false)]
        );
        assert_eq!(
            receiver.refreshed.lock().unwrap().clone(),
            vec![("s2".to_string(), false)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_respects_the_cap_and_skips_idless_shortcuts() {
        let id = SourceId::from("pkg/A");
        let lookup = Arc::new(StaticLookup {
            sources: vec![Arc::new(ValidatingSource {
                id: id.clone(),
                answer: None,
            })],
        });
        let repo = Arc::new(RecordingRepo::default());
        let receiver = Arc::new(RecordingReceiver::default());

        let shortcuts = vec![
            shortcut("pkg/A", "s1"),
            Suggestion::builder("pkg/A").title("no id").build(),
            shortcut("pkg/A", "s2"),
            shortcut("pkg/A", "s3"),
        ];
        let mut refresher = ShortcutRefresher::new(lookup, repo.clone(), shortcuts, 3);
        refresher.refresh(receiver.clone());
        settle().await;

        let ids: Vec<String> = repo
            .refreshes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, id, _)| id.clone())
            .collect();
        // The cap counts list positions, and the id-less entry is skipped.
        assert_eq!(ids, vec!["s1".to_string(), "s2".to_string()]);
    }
}
