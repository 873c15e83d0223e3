use std::sync::Arc;

use anyhow::Result;

use crate::ids::SourceId;
use crate::suggestion::{SourceResponse, Suggestion};

/// One suggestion source. Stateless from the engine's perspective.
#[async_trait::async_trait]
pub trait SuggestionSourcePort: Send + Sync {
    fn source_id(&self) -> SourceId;

    fn label(&self) -> String;

    fn icon(&self) -> Option<String> {
        None
    }

    /// Minimum query length below which the source is not queried.
    fn query_threshold(&self) -> usize {
        0
    }

    /// Whether the source wants to be queried again for supersets of a
    /// query it returned zero results for.
    fn query_after_zero_results(&self) -> bool {
        false
    }

    /// Answer `query` with at most `max_results` rows, reporting totals
    /// against the advisory `query_limit`.
    async fn suggest(
        &self,
        query: &str,
        max_results: usize,
        query_limit: usize,
    ) -> Result<SourceResponse>;

    /// Revalidate a previously clicked suggestion. `None` means the
    /// shortcut no longer exists and should be deleted.
    async fn validate_shortcut(&self, shortcut_id: &str) -> Result<Option<Suggestion>>;
}

/// Resolves source ids to live sources.
pub trait SourceLookupPort: Send + Sync {
    fn source_by_id(&self, id: &SourceId) -> Option<Arc<dyn SuggestionSourcePort>>;

    /// The web search source currently selected by the host, if any.
    fn selected_web_source(&self) -> Option<Arc<dyn SuggestionSourcePort>>;
}
