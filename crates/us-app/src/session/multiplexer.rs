use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::{debug, warn};

use us_core::ports::{SuggestionReceiver, SuggestionSourcePort};
use us_core::SourceResponse;

/// Fans one query out to a set of sources, reporting each completion (or a
/// surrogate for a failure) back to a receiver as it arrives.
///
/// For every source, `on_source_query_start` is delivered exactly once and
/// strictly before any `on_source_result`. A source that errors or exceeds
/// the timeout is reported as an empty error response; a cancelled task
/// reports nothing at all.
pub struct QueryMultiplexer {
    query: String,
    sources: Vec<Arc<dyn SuggestionSourcePort>>,
    max_results: usize,
    query_limit: usize,
    timeout_ms: u64,
    sent: Vec<AbortHandle>,
}

impl QueryMultiplexer {
    pub fn new(
        query: &str,
        sources: Vec<Arc<dyn SuggestionSourcePort>>,
        max_results: usize,
        query_limit: usize,
        timeout_ms: u64,
    ) -> Self {
        let sent = Vec::with_capacity(sources.len());
        Self {
            query: query.to_string(),
            sources,
            max_results,
            query_limit,
            timeout_ms,
            sent,
        }
    }

    /// Schedules one task per source. The receiver is handed to the tasks
    /// rather than kept, so a receiver that owns this multiplexer does not
    /// keep itself alive.
    pub fn send_query(&mut self, receiver: Arc<dyn SuggestionReceiver>) {
        debug!(query = %self.query, sources = self.sources.len(), "sending query");
        for source in &self.sources {
            let handle = tokio::spawn(run_source_query(
                source.clone(),
                self.query.clone(),
                self.max_results,
                self.query_limit,
                self.timeout_ms,
                receiver.clone(),
            ));
            self.sent.push(handle.abort_handle());
        }
    }

    /// Aborts every outstanding task. Completions already delivered stay
    /// delivered; everything else is silently dropped. Idempotent.
    pub fn cancel(&mut self) {
        for handle in &self.sent {
            handle.abort();
        }
    }
}

async fn run_source_query(
    source: Arc<dyn SuggestionSourcePort>,
    query: String,
    max_results: usize,
    query_limit: usize,
    timeout_ms: u64,
    receiver: Arc<dyn SuggestionReceiver>,
) {
    let id = source.source_id();
    receiver.on_source_query_start(&id);

    let outcome = tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        source.suggest(&query, max_results, query_limit),
    )
    .await;

    let response = match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(error)) => {
            warn!(source = %id, query = %query, %error, "source failed, reporting empty result");
            SourceResponse::empty_error(id)
        }
        Err(_) => {
            warn!(source = %id, query = %query, timeout_ms, "source timed out, reporting empty result");
            SourceResponse::empty_error(id)
        }
    };
    receiver.on_source_result(response);
}
