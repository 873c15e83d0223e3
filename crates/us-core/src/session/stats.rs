use std::collections::HashSet;

use crate::ids::SourceId;
use crate::suggestion::Suggestion;

/// Outcome of one closed typing session, reported to the shortcut
/// repository exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The query of the last cursor the session produced.
    pub query: String,
    /// The suggestion the user launched, if any.
    pub clicked: Option<Suggestion>,
    /// Sources whose results were actually shown to the user.
    pub source_impressions: HashSet<SourceId>,
}

impl SessionStats {
    pub fn new(
        query: impl Into<String>,
        clicked: Option<Suggestion>,
        source_impressions: HashSet<SourceId>,
    ) -> Self {
        Self {
            query: query.into(),
            clicked,
            source_impressions,
        }
    }
}
