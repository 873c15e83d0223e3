use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// A one-shot delayed task whose cancellation reports whether it won the
/// race against the task body. Callers that account for scheduled work can
/// then balance their bookkeeping exactly once: either the body ran, or
/// `cancel` returned `true`.
pub struct CancellableTask {
    state: Arc<AtomicU8>,
    abort: AbortHandle,
}

impl CancellableTask {
    pub fn spawn_delayed<F>(delay: Duration, body: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(PENDING));
        let flag = state.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if flag
                .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                body.await;
            }
        });
        Self {
            state,
            abort: handle.abort_handle(),
        }
    }

    /// Requests cancellation. Returns `true` iff the body had not started
    /// and never will. Idempotent; later calls return `false`.
    pub fn cancel(&self) -> bool {
        let won = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.abort.abort();
        won
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test(start_paused = true)]
    async fn body_runs_after_delay() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let _task = CancellableTask::spawn_delayed(Duration::from_millis(500), async move {
            flag.store(true, Ordering::SeqCst);
        });
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_millis(499)).await;
        tokio::task::yield_now().await;
        assert!(!ran.load(Ordering::SeqCst));

        tokio::time::advance(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_fire_wins_once() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let task = CancellableTask::spawn_delayed(Duration::from_millis(500), async move {
            flag.store(true, Ordering::SeqCst);
        });

        assert!(task.cancel());
        assert!(!task.cancel(), "second cancel must not win again");

        tokio::time::advance(Duration::from_millis(1_000)).await;
        tokio::task::yield_now().await;
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_fire_loses() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let task = CancellableTask::spawn_delayed(Duration::from_millis(10), async move {
            flag.store(true, Ordering::SeqCst);
        });
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_millis(10)).await;
        tokio::task::yield_now().await;
        assert!(ran.load(Ordering::SeqCst));
        assert!(!task.cancel());
    }
}
