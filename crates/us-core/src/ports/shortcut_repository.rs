use anyhow::Result;

use crate::ids::SourceId;
use crate::session::SessionStats;
use crate::suggestion::Suggestion;

/// Durable click-log and aggregate stats: prefix-matched shortcut lookup
/// with time-decayed ranking, click-through-rate source ranking, and
/// shortcut refresh.
#[async_trait::async_trait]
pub trait ShortcutRepositoryPort: Send + Sync {
    /// Whether any shortcut has ever been recorded.
    async fn has_history(&self) -> Result<bool>;

    /// Empties all shortcut and stats tables.
    async fn clear_history(&self) -> Result<()>;

    /// Records the outcome of one closed session: the clicked suggestion
    /// (if shortcuttable) and one impression row per viewed source.
    async fn report_stats(&self, stats: &SessionStats) -> Result<()>;

    /// Shortcuts whose original query starts with `query`, ordered by
    /// recency-weighted click frequency. The empty query matches all
    /// non-expired shortcuts.
    async fn shortcuts_for_query(&self, query: &str) -> Result<Vec<Suggestion>>;

    /// Sources ordered by click-through rate, best first.
    async fn source_ranking(&self) -> Result<Vec<SourceId>>;

    /// Replaces the mutable display fields of a stored shortcut, or
    /// deletes it (cascading to its click log) when `refreshed` is `None`.
    async fn refresh_shortcut(
        &self,
        source: &SourceId,
        shortcut_id: &str,
        refreshed: Option<&Suggestion>,
    ) -> Result<()>;
}
