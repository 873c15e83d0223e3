use serde::{Deserialize, Serialize};

const DAY_MS: i64 = 86_400_000;

/// Engine tunables. `Default` carries the normative values; hosts may
/// deserialize overrides from their settings layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many of the ordered enabled sources are queried above the fold.
    pub num_promoted_sources: usize,
    /// Result rows shown before the "more results" section, shortcuts and
    /// built-ins aside.
    pub max_results_to_display: usize,
    /// Cap on rows requested from any single source.
    pub max_results_per_source: usize,
    /// How long promoted sources get before late results are relegated to
    /// the "more results" section.
    pub promoted_deadline_ms: i64,
    /// Per-source wall-clock budget before an empty error response is
    /// reported on its behalf.
    pub source_timeout_ms: u64,
    /// How long a new, empty keystroke may keep showing the previous
    /// keystroke's rows.
    pub prefill_ms: u64,
    /// Fan-out delay while the user is typing steadily (three-keystroke
    /// window).
    pub typing_delay_last_three_ms: i64,
    /// Fan-out delay when only the latest keystroke gap is short.
    pub typing_delay_last_two_ms: i64,
    /// Coalescing window for cursor change notifications.
    pub cursor_notify_window_ms: i64,
    /// Clicks older than this neither surface nor rank shortcuts.
    pub max_stat_age_ms: i64,
    /// Per-source click/impression rows older than this are purged.
    pub max_source_event_age_ms: i64,
    /// Prior clicks cushioning the CTR ranking against tiny samples.
    pub prior_clicks: i64,
    /// Prior impressions cushioning the CTR ranking against tiny samples.
    pub prior_impressions: i64,
    /// Bound on per-query result sets kept by the session cache.
    pub max_cached_queries: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_promoted_sources: 4,
            max_results_to_display: 7,
            max_results_per_source: 58,
            promoted_deadline_ms: 3_500,
            source_timeout_ms: 10_000,
            prefill_ms: 400,
            typing_delay_last_three_ms: 800,
            typing_delay_last_two_ms: 500,
            cursor_notify_window_ms: 100,
            max_stat_age_ms: 7 * DAY_MS,
            max_source_event_age_ms: 30 * DAY_MS,
            prior_clicks: 3,
            prior_impressions: 30,
            max_cached_queries: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_contract() {
        let config = EngineConfig::default();
        assert_eq!(config.num_promoted_sources, 4);
        assert_eq!(config.max_results_to_display, 7);
        assert_eq!(config.max_results_per_source, 58);
        assert_eq!(config.promoted_deadline_ms, 3_500);
        assert_eq!(config.max_stat_age_ms, 7 * 24 * 3600 * 1000);
        assert_eq!(config.max_source_event_age_ms, 30 * 24 * 3600 * 1000);
    }
}
