//! Fire-and-forget store writes.
//!
//! Every submission is spawned and returns a `PendingWrite` immediately; the
//! caller never has to await it. Recoverable failures are retried with
//! exponential backoff; fatal ones (or exhausted retries) become a `Notice`
//! on the notice channel so the presentation layer can show them.
//!
//! Spawned writes are counted until they finish so shutdown can `drain` them
//! before the runtime goes away.

use crate::domain::{DomainError, Notice};
use crate::ports::{ChildRef, StorePort};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Handle to a spawned write. Dropping it detaches the write.
pub type PendingWrite = JoinHandle<Result<(), DomainError>>;

/// Retry settings for store writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries including the first one. 1 disables retries.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// One store mutation.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Create { child: ChildRef, value: Value },
    Delete { path: String },
}

impl WriteOp {
    fn path(&self) -> String {
        match self {
            WriteOp::Create { child, .. } => child.path(),
            WriteOp::Delete { path } => path.clone(),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            WriteOp::Create { .. } => "save",
            WriteOp::Delete { .. } => "delete",
        }
    }
}

/// Writes spawned but not yet finished.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Held by a spawned write; released when the task ends or is cancelled.
struct InFlightGuard(Arc<InFlight>);

impl InFlightGuard {
    fn acquire(in_flight: &Arc<InFlight>) -> Self {
        in_flight.count.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(in_flight))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Spawns store writes with retry and failure notices.
#[derive(Clone)]
pub struct WriteDispatcher {
    store: Arc<dyn StorePort>,
    retry: RetryPolicy,
    notices: mpsc::UnboundedSender<Notice>,
    in_flight: Arc<InFlight>,
}

impl WriteDispatcher {
    pub fn new(
        store: Arc<dyn StorePort>,
        retry: RetryPolicy,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> Self {
        Self {
            store,
            retry,
            notices,
            in_flight: Arc::default(),
        }
    }

    /// Reserve a child key under `path` (no I/O).
    pub fn create_child(&self, path: &str) -> ChildRef {
        self.store.create_child(path)
    }

    /// Spawn `op` and return without waiting for it.
    pub fn submit(&self, op: WriteOp) -> PendingWrite {
        let store = Arc::clone(&self.store);
        let retry = self.retry;
        let notices = self.notices.clone();
        let guard = InFlightGuard::acquire(&self.in_flight);
        tokio::spawn(async move {
            let _guard = guard;
            let result = run_with_retry(&*store, &op, retry).await;
            if let Err(ref e) = result {
                error!(path = %op.path(), error = %e, "write dropped");
                let notice = Notice::new(format!(
                    "Could not {} {}: {}",
                    op.describe(),
                    op.path(),
                    e
                ));
                // Ledger loop may already be gone at shutdown.
                let _ = notices.send(notice);
            }
            result
        })
    }

    /// Writes still running, retries and backoff sleeps included.
    pub fn pending(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Wait until every submitted write has finished or `timeout` passes.
    /// Returns the number still running.
    pub async fn drain(&self, timeout: Duration) -> usize {
        let idle = async {
            loop {
                let notified = self.in_flight.idle.notified();
                tokio::pin!(notified);
                // Register before checking so a release in between is not missed.
                notified.as_mut().enable();
                if self.pending() == 0 {
                    return;
                }
                notified.await;
            }
        };
        if tokio::time::timeout(timeout, idle).await.is_err() {
            warn!(
                pending = self.pending(),
                timeout_ms = timeout.as_millis() as u64,
                "gave up waiting for store writes"
            );
        }
        self.pending()
    }
}

async fn run_with_retry(
    store: &dyn StorePort,
    op: &WriteOp,
    retry: RetryPolicy,
) -> Result<(), DomainError> {
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = match op {
            WriteOp::Create { child, value } => store.write(child, value.clone()).await,
            WriteOp::Delete { path } => store.delete(path).await,
        };
        match result {
            Ok(()) => {
                debug!(path = %op.path(), attempt, "write done");
                return Ok(());
            }
            Err(e) if e.is_recoverable() && attempt < max_attempts => {
                let delay = retry.delay_for(attempt);
                warn!(
                    path = %op.path(),
                    attempt,
                    retry_ms = delay.as_millis() as u64,
                    error = %e,
                    "write failed; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
