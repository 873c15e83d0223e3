use crate::ids::SourceId;

/// What one source contributes to the "more results" section: enough to
/// render its corpus entry and count line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStat {
    pub source: SourceId,
    /// Whether the source has rows showing in the promoted slots.
    pub promoted: bool,
    pub label: String,
    pub icon: Option<String>,
    pub responded: bool,
    /// Results not displayed above the fold (total results for
    /// non-promoted sources).
    pub num_results: usize,
    /// The advisory limit the count was reported against, adjusted for
    /// rows already displayed.
    pub query_limit: usize,
}
