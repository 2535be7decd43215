//! Background recount of org unit data counters.
//!
//! Handlers call [`RecountQueue::enqueue`] after committing a change that
//! moves records between units. [`RecountWorker`] drains the queue on its
//! own task: requests that arrive while one is waiting are coalesced into a
//! single recount, a failing recount is retried with exponential backoff,
//! and the worker exits when its [`CancellationToken`] is cancelled.
//!
//! Delivery is at-least-once. A request enqueued while a recount is running
//! stays queued and triggers another run afterwards.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use learnhub_db::repositories::OrgUnitRepo;
use learnhub_db::DbPool;

/// Queue depth. A full queue already guarantees a pending recount.
const QUEUE_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Store seam
// ---------------------------------------------------------------------------

/// Something that can rewrite every unit's counters.
pub trait CounterStore: Send + Sync + 'static {
    /// Recompute all counters, returning the number of units written.
    fn recount(&self) -> BoxFuture<'_, Result<usize, sqlx::Error>>;
}

impl CounterStore for DbPool {
    fn recount(&self) -> BoxFuture<'_, Result<usize, sqlx::Error>> {
        Box::pin(OrgUnitRepo::recount(self))
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Worker timing.
#[derive(Debug, Clone)]
pub struct RecountConfig {
    /// Wait after the first request before recounting, so bursts coalesce.
    pub settle_delay: Duration,
    /// Total tries per recount, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub initial_backoff: Duration,
    /// Upper bound on a single backoff delay.
    pub max_backoff: Duration,
}

impl Default for RecountConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RecountConfig {
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// Why a recount was requested. Logged only.
#[derive(Debug, Clone)]
pub struct RecountRequest {
    pub reason: String,
}

/// Sending half, cheap to clone into handlers.
#[derive(Clone)]
pub struct RecountQueue {
    sender: mpsc::Sender<RecountRequest>,
}

impl RecountQueue {
    /// Create a queue and the worker that drains it.
    pub fn new<S: CounterStore>(store: S, config: RecountConfig) -> (Self, RecountWorker<S>) {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let worker = RecountWorker {
            store,
            receiver,
            config,
        };
        (Self { sender }, worker)
    }

    /// Request a recount. Never blocks.
    pub fn enqueue(&self, reason: impl Into<String>) {
        let request = RecountRequest {
            reason: reason.into(),
        };
        match self.sender.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => {
                tracing::debug!(reason = %request.reason, "Recount already queued, coalescing");
            }
            Err(TrySendError::Closed(request)) => {
                tracing::warn!(reason = %request.reason, "Recount worker stopped, request dropped");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Counts reported when the worker exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecountStats {
    /// Recounts that eventually succeeded.
    pub completed: u32,
    /// Recounts abandoned after exhausting their attempts.
    pub abandoned: u32,
    /// Requests folded into another request's recount.
    pub coalesced: u32,
}

/// Receiving half; run it on its own task.
pub struct RecountWorker<S> {
    store: S,
    receiver: mpsc::Receiver<RecountRequest>,
    config: RecountConfig,
}

impl<S: CounterStore> RecountWorker<S> {
    /// Process requests until cancelled or every sender is dropped.
    pub async fn run(mut self, cancel: CancellationToken) -> RecountStats {
        let mut stats = RecountStats::default();

        loop {
            let request = tokio::select! {
                _ = cancel.cancelled() => break,
                request = self.receiver.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            if !self.config.settle_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.settle_delay) => {}
                }
            }

            while self.receiver.try_recv().is_ok() {
                stats.coalesced += 1;
            }

            tracing::debug!(reason = %request.reason, "Recounting org unit counters");
            match self.recount_with_retry(&cancel).await {
                Some(true) => stats.completed += 1,
                Some(false) => stats.abandoned += 1,
                None => break,
            }
        }

        tracing::info!(
            completed = stats.completed,
            abandoned = stats.abandoned,
            coalesced = stats.coalesced,
            "Recount worker stopped"
        );
        stats
    }

    /// `Some(true)` on success, `Some(false)` once attempts run out, `None`
    /// if cancelled while backing off.
    async fn recount_with_retry(&self, cancel: &CancellationToken) -> Option<bool> {
        let mut attempt = 1;
        loop {
            match self.store.recount().await {
                Ok(units) => {
                    tracing::info!(units, attempt, "Org unit counters recomputed");
                    return Some(true);
                }
                Err(e) if attempt >= self.config.max_attempts => {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Giving up on counter recount, counters stay stale until the next trigger"
                    );
                    return Some(false);
                }
                Err(e) => {
                    let delay = self.config.backoff(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        "Counter recount failed, retrying"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return None,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Fails the first `failures` calls, then succeeds.
    #[derive(Clone, Default)]
    struct FakeStore {
        calls: Arc<AtomicU32>,
        failures: u32,
    }

    impl CounterStore for FakeStore {
        fn recount(&self) -> BoxFuture<'_, Result<usize, sqlx::Error>> {
            Box::pin(async move {
                let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                if call <= self.failures {
                    Err(sqlx::Error::PoolTimedOut)
                } else {
                    Ok(3)
                }
            })
        }
    }

    fn fast() -> RecountConfig {
        RecountConfig {
            settle_delay: Duration::ZERO,
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let config = RecountConfig {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            ..RecountConfig::default()
        };
        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(200));
        assert_eq!(config.backoff(3), Duration::from_millis(350));
        assert_eq!(config.backoff(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn queued_requests_coalesce_into_one_recount() {
        let store = FakeStore::default();
        let calls = store.calls.clone();
        let (queue, worker) = RecountQueue::new(store, fast());

        queue.enqueue("add service");
        queue.enqueue("delete");
        queue.enqueue("ou change");
        drop(queue);

        let stats = worker.run(CancellationToken::new()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.coalesced, 2);
    }

    #[tokio::test]
    async fn failing_recount_is_retried() {
        let store = FakeStore {
            failures: 2,
            ..FakeStore::default()
        };
        let calls = store.calls.clone();
        let (queue, worker) = RecountQueue::new(store, fast());

        queue.enqueue("bulk status");
        drop(queue);

        let stats = worker.run(CancellationToken::new()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.abandoned, 0);
    }

    #[tokio::test]
    async fn recount_is_abandoned_after_max_attempts() {
        let store = FakeStore {
            failures: u32::MAX,
            ..FakeStore::default()
        };
        let calls = store.calls.clone();
        let (queue, worker) = RecountQueue::new(store, fast());

        queue.enqueue("delete");
        drop(queue);

        let stats = worker.run(CancellationToken::new()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(stats.abandoned, 1);
    }

    #[tokio::test]
    async fn cancellation_stops_an_idle_worker() {
        let (queue, worker) = RecountQueue::new(FakeStore::default(), fast());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(worker.run(cancel.clone()));

        cancel.cancel();
        let stats = handle.await.unwrap();
        assert_eq!(stats, RecountStats::default());

        // The receiver is gone, so this only logs.
        queue.enqueue("after shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn settle_delay_gathers_late_requests() {
        let store = FakeStore::default();
        let calls = store.calls.clone();
        let config = fast().with_settle_delay(Duration::from_secs(10));
        let (queue, worker) = RecountQueue::new(store, config);
        let handle = tokio::spawn(worker.run(CancellationToken::new()));

        queue.enqueue("first");
        tokio::time::sleep(Duration::from_secs(5)).await;
        queue.enqueue("second");
        drop(queue);

        let stats = handle.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(stats.coalesced, 1);
    }
}
