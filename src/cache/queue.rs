//! Persistence queue
//!
//! Single-consumer pipeline that hands jobs to a `JobHandler` strictly in
//! submission order. One tokio task reads an unbounded channel, so for any
//! key the store sees writes in the order they were submitted.
//!
//! A job that keeps failing after `max_failure` attempts stops the queue:
//! it is marked non-working, the remaining jobs are discarded, and further
//! enqueues are refused until the owner rebuilds the tier.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::CacheError;

/// Processes jobs taken off a `PersistenceQueue`
#[async_trait]
pub trait JobHandler<J>: Send + Sync {
    async fn handle(&self, job: &J) -> Result<(), CacheError>;
}

/// Failure policy for the consumer
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Attempts per job before the queue gives up (minimum 1)
    pub max_failure: u32,
    /// Pause between attempts of the same job
    pub wait_before_retry: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_failure: 1,
            wait_before_retry: Duration::from_millis(500),
        }
    }
}

/// Snapshot of queue health and throughput
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct QueueStats {
    /// False once a job exhausted its attempts or the queue was destroyed
    pub working: bool,
    /// False once the queue was destroyed
    pub alive: bool,
    /// Jobs enqueued and not yet finished (including the one in flight)
    pub pending: usize,
    /// Jobs handled successfully
    pub processed: u64,
    /// Failed attempts, retried or not
    pub failures: u64,
}

struct QueueState {
    working: AtomicBool,
    destroyed: AtomicBool,
    pending: AtomicUsize,
    processed: AtomicU64,
    failures: AtomicU64,
}

impl QueueState {
    fn new() -> Self {
        Self {
            working: AtomicBool::new(true),
            destroyed: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
            processed: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Mark the queue dead; returns false if it already was
    fn shut(&self) -> bool {
        self.working.store(false, Ordering::SeqCst);
        let first = !self.destroyed.swap(true, Ordering::SeqCst);
        self.pending.store(0, Ordering::SeqCst);
        first
    }
}

/// FIFO job queue drained by one background task
pub struct PersistenceQueue<J> {
    name: String,
    sender: Mutex<Option<mpsc::UnboundedSender<J>>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    state: Arc<QueueState>,
}

impl<J> PersistenceQueue<J>
where
    J: Send + Sync + 'static,
{
    /// Spawn the consumer task; must be called inside a tokio runtime
    pub fn start(
        name: impl Into<String>,
        handler: Arc<dyn JobHandler<J>>,
        settings: QueueSettings,
    ) -> Self {
        let name = name.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        let state = Arc::new(QueueState::new());

        let consumer = tokio::spawn(run_consumer(
            name.clone(),
            receiver,
            handler,
            settings,
            state.clone(),
        ));

        Self {
            name,
            sender: Mutex::new(Some(sender)),
            consumer: Mutex::new(Some(consumer)),
            state,
        }
    }

    /// Queue a job behind every job already submitted
    pub fn enqueue(&self, job: J) -> Result<(), CacheError> {
        let not_working = || CacheError::QueueNotWorking {
            cache_name: self.name.clone(),
        };

        if !self.is_working() {
            tracing::warn!(cache_name = %self.name, "Not enqueuing job: queue is non-functional");
            return Err(not_working());
        }

        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(not_working());
        };

        self.state.pending.fetch_add(1, Ordering::SeqCst);
        if sender.send(job).is_err() {
            let _ = self
                .state
                .pending
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            return Err(not_working());
        }
        Ok(())
    }

    /// True when no job is queued or in flight
    pub fn is_empty(&self) -> bool {
        self.state.pending.load(Ordering::SeqCst) == 0
    }

    pub fn is_working(&self) -> bool {
        self.state.working.load(Ordering::SeqCst)
    }

    pub fn is_alive(&self) -> bool {
        !self.state.destroyed.load(Ordering::SeqCst)
    }

    /// Stop the consumer and discard every undrained job
    ///
    /// A job in flight is cancelled at its next await point.
    pub fn destroy(&self) {
        // Held across shut so no enqueue can bump pending after it is zeroed
        let mut sender = self.sender.lock();
        let discarded = self.state.pending.load(Ordering::SeqCst);
        if !self.state.shut() {
            return;
        }
        sender.take();
        drop(sender);
        if let Some(consumer) = self.consumer.lock().take() {
            consumer.abort();
        }
        tracing::info!(
            cache_name = %self.name,
            discarded = discarded,
            processed = self.state.processed.load(Ordering::SeqCst),
            "Persistence queue destroyed"
        );
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            working: self.is_working(),
            alive: self.is_alive(),
            pending: self.state.pending.load(Ordering::SeqCst),
            processed: self.state.processed.load(Ordering::SeqCst),
            failures: self.state.failures.load(Ordering::SeqCst),
        }
    }
}

async fn run_consumer<J>(
    name: String,
    mut receiver: mpsc::UnboundedReceiver<J>,
    handler: Arc<dyn JobHandler<J>>,
    settings: QueueSettings,
    state: Arc<QueueState>,
) where
    J: Send + Sync + 'static,
{
    while let Some(job) = receiver.recv().await {
        if state.destroyed.load(Ordering::SeqCst) {
            break;
        }

        let handled = handle_with_retry(&name, &job, handler.as_ref(), &settings, &state).await;
        if !handled {
            receiver.close();
            if state.shut() {
                tracing::error!(
                    cache_name = %name,
                    "Job exhausted its attempts, persistence queue is now non-functional"
                );
            }
            break;
        }

        state.processed.fetch_add(1, Ordering::SeqCst);
        // destroy() may have zeroed the counter while this job was finishing
        let _ = state
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
    tracing::debug!(cache_name = %name, "Persistence queue consumer stopped");
}

async fn handle_with_retry<J>(
    name: &str,
    job: &J,
    handler: &dyn JobHandler<J>,
    settings: &QueueSettings,
    state: &QueueState,
) -> bool {
    let max_failure = settings.max_failure.max(1);
    let mut attempts = 0;

    loop {
        match handler.handle(job).await {
            Ok(()) => return true,
            Err(e) => {
                attempts += 1;
                state.failures.fetch_add(1, Ordering::SeqCst);
                if attempts >= max_failure {
                    tracing::warn!(
                        cache_name = %name,
                        attempts = attempts,
                        error = %e,
                        "Dropping job after repeated failures"
                    );
                    return false;
                }
                tracing::info!(
                    cache_name = %name,
                    attempts = attempts,
                    error = %e,
                    "Job failed, retrying"
                );
                tokio::time::sleep(settings.wait_before_retry).await;
            }
        }
    }
}
