use serde::{Deserialize, Serialize};

use crate::ids::SourceId;
use crate::suggestion::Suggestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultCode {
    Ok,
    Error,
}

/// One source's answer to one query.
///
/// Invariant: `suggestions.len() <= count <= query_limit`. `count` may
/// exceed the number of rows actually returned when the source truncated
/// its answer to `max_results`; `query_limit` is the advisory ceiling the
/// source was asked to report against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResponse {
    pub source: SourceId,
    pub suggestions: Vec<Suggestion>,
    pub count: usize,
    pub query_limit: usize,
    pub result_code: ResultCode,
}

impl SourceResponse {
    pub fn new(
        source: impl Into<SourceId>,
        suggestions: Vec<Suggestion>,
        count: usize,
        query_limit: usize,
    ) -> Self {
        let count = count.max(suggestions.len());
        Self {
            source: source.into(),
            query_limit: query_limit.max(count),
            count,
            suggestions,
            result_code: ResultCode::Ok,
        }
    }

    /// A response whose `count` is exactly the rows returned.
    pub fn from_suggestions(
        source: impl Into<SourceId>,
        suggestions: Vec<Suggestion>,
        query_limit: usize,
    ) -> Self {
        let count = suggestions.len();
        Self::new(source, suggestions, count, query_limit)
    }

    /// The surrogate reported on behalf of a source that failed or timed
    /// out, so that downstream bookkeeping can still make progress.
    pub fn empty_error(source: impl Into<SourceId>) -> Self {
        Self {
            source: source.into(),
            suggestions: Vec::new(),
            count: 0,
            query_limit: 0,
            result_code: ResultCode::Error,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    pub fn is_error(&self) -> bool {
        self.result_code == ResultCode::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: usize) -> Suggestion {
        Suggestion::builder("pkg/App").title(format!("item {n}")).build()
    }

    #[test]
    fn count_is_clamped_to_returned_rows() {
        let r = SourceResponse::new("pkg/App", vec![item(0), item(1)], 1, 10);
        assert_eq!(r.count, 2);
        assert_eq!(r.query_limit, 10);
    }

    #[test]
    fn query_limit_is_clamped_to_count() {
        let r = SourceResponse::new("pkg/App", vec![item(0), item(1)], 5, 2);
        assert_eq!(r.count, 5);
        assert_eq!(r.query_limit, 5);
    }

    #[test]
    fn empty_error_carries_error_code() {
        let r = SourceResponse::empty_error("pkg/App");
        assert!(r.is_error());
        assert!(r.is_empty());
        assert_eq!(r.count, 0);
    }
}
