use crate::ids::SourceId;
use crate::suggestion::{SourceResponse, Suggestion};

/// Receives fan-out completions. Implementations must be cheap and
/// non-blocking; calls arrive from worker tasks.
///
/// For any source, `on_source_query_start` is invoked at most once per
/// fan-out and strictly before any `on_source_result` for that source.
pub trait SuggestionReceiver: Send + Sync {
    fn on_source_query_start(&self, source: &SourceId);

    fn on_source_result(&self, response: SourceResponse);

    fn on_shortcut_refreshed(
        &self,
        source: &SourceId,
        shortcut_id: &str,
        refreshed: Option<Suggestion>,
    );
}
