use std::sync::Arc;

use anyhow::Result;

use us_core::ports::{SuggestionBackendPort, SuggestionSourcePort};
use us_core::suggestion::row::RowContext;
use us_core::{SourceId, SourceResponse, Suggestion};

/// Static description of a tabular source: identity, display metadata,
/// query behavior, and the defaults rows are interpreted against.
#[derive(Debug, Clone)]
pub struct TabularSourceDescriptor {
    pub id: SourceId,
    pub label: String,
    pub icon: Option<String>,
    pub query_threshold: usize,
    pub query_after_zero_results: bool,
    /// Package half of the id, used to absolutize resource icons.
    pub source_package: String,
    pub default_intent_action: Option<String>,
    pub default_intent_data: Option<String>,
}

impl TabularSourceDescriptor {
    fn row_context(&self) -> RowContext {
        RowContext {
            source: self.id.clone(),
            source_package: self.source_package.clone(),
            default_icon: self.icon.clone(),
            default_intent_action: self.default_intent_action.clone(),
            default_intent_data: self.default_intent_data.clone(),
        }
    }
}

/// Adapts any row-shaped backend into a suggestion source. The backend is
/// asked for up to `query_limit` rows so the total can be reported, but
/// only the first `max_results` are normalized and returned.
pub struct TabularSuggestionSource {
    descriptor: TabularSourceDescriptor,
    backend: Arc<dyn SuggestionBackendPort>,
}

impl TabularSuggestionSource {
    pub fn new(descriptor: TabularSourceDescriptor, backend: Arc<dyn SuggestionBackendPort>) -> Self {
        Self {
            descriptor,
            backend,
        }
    }
}

#[async_trait::async_trait]
impl SuggestionSourcePort for TabularSuggestionSource {
    fn source_id(&self) -> SourceId {
        self.descriptor.id.clone()
    }

    fn label(&self) -> String {
        self.descriptor.label.clone()
    }

    fn icon(&self) -> Option<String> {
        self.descriptor.icon.clone()
    }

    fn query_threshold(&self) -> usize {
        self.descriptor.query_threshold
    }

    fn query_after_zero_results(&self) -> bool {
        self.descriptor.query_after_zero_results
    }

    async fn suggest(
        &self,
        query: &str,
        max_results: usize,
        query_limit: usize,
    ) -> Result<SourceResponse> {
        let rows = self.backend.query_rows(query, query_limit).await?;
        let count = rows.len();
        let context = self.descriptor.row_context();
        let suggestions = rows
            .into_iter()
            .take(max_results)
            .map(|row| row.into_suggestion(&context))
            .collect();
        Ok(SourceResponse::new(
            self.descriptor.id.clone(),
            suggestions,
            count,
            query_limit,
        ))
    }

    async fn validate_shortcut(&self, shortcut_id: &str) -> Result<Option<Suggestion>> {
        let row = self.backend.shortcut_row(shortcut_id).await?;
        let context = self.descriptor.row_context();
        Ok(row.map(|row| row.into_suggestion(&context)))
    }
}
