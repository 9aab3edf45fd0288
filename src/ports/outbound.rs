//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{DomainError, LedgerView, Notice, Snapshot};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Location of a freshly created child node: `<parent>/<key>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRef {
    pub parent: String,
    pub key: String,
}

impl ChildRef {
    pub fn new(parent: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            key: key.into(),
        }
    }

    /// Full store path of the child.
    pub fn path(&self) -> String {
        format!("{}/{}", self.parent, self.key)
    }
}

/// One item on a subscription feed. An `Err` is terminal: the adapter gave up
/// on the feed (cancelled listener, permission denied) and sends nothing more.
pub type FeedItem = Result<Snapshot, DomainError>;

/// Live change feed for one store path.
///
/// Yields the current snapshot first, then one snapshot per change. Dropping
/// the subscription unsubscribes (and stops the adapter's feeder task, if any).
pub struct Subscription {
    path: String,
    rx: mpsc::UnboundedReceiver<FeedItem>,
    feeder: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(path: impl Into<String>, rx: mpsc::UnboundedReceiver<FeedItem>) -> Self {
        Self {
            path: path.into(),
            rx,
            feeder: None,
        }
    }

    /// Attach the background task that feeds this subscription.
    pub fn with_feeder(mut self, feeder: JoinHandle<()>) -> Self {
        self.feeder = Some(feeder);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Next snapshot, or the error that ended the feed. `None` once closed.
    pub async fn next(&mut self) -> Option<FeedItem> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
        }
    }
}

/// Realtime tree store addressed by slash-separated paths.
#[async_trait::async_trait]
pub trait StorePort: Send + Sync {
    /// Reserve a new child under `path` with a generated, chronologically
    /// ordered unique key. Nothing is written yet.
    fn create_child(&self, path: &str) -> ChildRef;

    /// Persist `value` at `child`. A JSON `null` removes the node.
    async fn write(&self, child: &ChildRef, value: serde_json::Value) -> Result<(), DomainError>;

    /// Remove the node at `path`. Removing a missing node is not an error.
    async fn delete(&self, path: &str) -> Result<(), DomainError>;

    /// Subscribe to all children of `path`.
    async fn subscribe(&self, path: &str) -> Result<Subscription, DomainError>;
}

/// Presentation port. Renders the ledger and user-visible notices.
pub trait PresenterPort: Send + Sync {
    /// Full refresh: lists, total and per-traveler split.
    fn render(&self, view: &LedgerView);

    /// Show a failure the user should know about (e.g. a dropped write).
    fn notify(&self, notice: &Notice);
}
