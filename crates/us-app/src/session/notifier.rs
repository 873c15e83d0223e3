use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use us_core::ports::ClockPort;

/// Coalesced change notification for one cursor: consumers get at most one
/// wake-up per window, delivered at the end of the window so bursts of
/// incoming results collapse into a single re-read.
pub struct ChangeNotifier {
    clock: Arc<dyn ClockPort>,
    window_ms: i64,
    next_notify_ms: Mutex<i64>,
    closed: AtomicBool,
    tx: watch::Sender<u64>,
}

impl ChangeNotifier {
    pub fn new(clock: Arc<dyn ClockPort>, window_ms: i64) -> Arc<Self> {
        let (tx, _rx) = watch::channel(0);
        Arc::new(Self {
            clock,
            window_ms,
            next_notify_ms: Mutex::new(0),
            closed: AtomicBool::new(false),
            tx,
        })
    }

    /// A receiver whose value bumps every time the snapshot should be
    /// re-read.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    /// Requests a change notification. No-op when one is already scheduled
    /// within the coalescing window or the cursor closed.
    pub fn notify(&self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let now = self.clock.now_ms();
        {
            let mut next = self.next_notify_ms.lock().unwrap();
            if now < *next {
                return;
            }
            *next = now + self.window_ms;
        }
        let tx = self.tx.clone();
        let delay = Duration::from_millis(self.window_ms.max(0) as u64);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send_modify(|version| *version += 1);
        });
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
