use anyhow::Result;

use crate::suggestion::row::SuggestionRow;

/// A tabular suggestion backend: answers queries and shortcut lookups as
/// raw rows in the wire shape, leaving normalization to the adapter that
/// wraps it into a source.
#[async_trait::async_trait]
pub trait SuggestionBackendPort: Send + Sync {
    /// Rows for `query`, at most `query_limit` of them.
    async fn query_rows(&self, query: &str, query_limit: usize) -> Result<Vec<SuggestionRow>>;

    /// The current row behind a previously clicked suggestion, or `None`
    /// when it no longer exists.
    async fn shortcut_row(&self, shortcut_id: &str) -> Result<Option<SuggestionRow>>;
}
