//! In-process implementation of StorePort.
//!
//! Same observable contract as the hosted store: generated push ids, ordered
//! snapshots, an immediate snapshot on subscribe and a fresh one after every
//! change. Used for offline mode and tests. Write failures and cancelled
//! listeners can be injected to exercise error handling.

use crate::adapters::store::mirror::ordered_children;
use crate::adapters::store::push_id::PushIdGenerator;
use crate::domain::{DomainError, Snapshot};
use crate::ports::{ChildRef, FeedItem, StorePort, Subscription};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

#[derive(Default)]
struct StoreData {
    /// top-level path -> key -> value
    nodes: HashMap<String, BTreeMap<String, Value>>,
    subscribers: Vec<(String, mpsc::UnboundedSender<FeedItem>)>,
    injected_failures: VecDeque<DomainError>,
}

impl StoreData {
    fn snapshot(&self, path: &str) -> Snapshot {
        let children = self
            .nodes
            .get(path)
            .map(ordered_children)
            .unwrap_or_default();
        Snapshot::new(path, children)
    }

    fn broadcast(&mut self, path: &str) {
        let snapshot = self.snapshot(path);
        self.subscribers.retain(|(sub_path, tx)| {
            if sub_path != path {
                return !tx.is_closed();
            }
            tx.send(Ok(snapshot.clone())).is_ok()
        });
    }

    fn take_failure(&mut self) -> Result<(), DomainError> {
        match self.injected_failures.pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Memory-backed realtime store.
#[derive(Default)]
pub struct InMemoryStore {
    data: Mutex<StoreData>,
    ids: PushIdGenerator,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write/delete calls fail with these errors, in order.
    pub async fn inject_failures(&self, failures: impl IntoIterator<Item = DomainError>) {
        self.data.lock().await.injected_failures.extend(failures);
    }

    /// End every subscription on `path` with `error`, as the hosted store does
    /// when it revokes a listener.
    pub async fn cancel_subscriptions(&self, path: &str, error: DomainError) {
        let mut data = self.data.lock().await;
        data.subscribers.retain(|(sub_path, tx)| {
            if sub_path != path {
                return true;
            }
            let _ = tx.send(Err(error.clone()));
            false
        });
    }

    /// Current children of `path` (test/debug helper).
    pub async fn snapshot(&self, path: &str) -> Snapshot {
        self.data.lock().await.snapshot(path)
    }
}

/// Split `expenses/abc` into (`expenses`, Some(`abc`)).
fn split_path(path: &str) -> Result<(&str, Option<&str>), DomainError> {
    let trimmed = path.trim_matches('/');
    let mut parts = trimmed.splitn(2, '/');
    let parent = parts
        .next()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| DomainError::StoreRejected(format!("invalid path '{path}'")))?;
    let key = parts.next();
    if key.is_some_and(|k| k.is_empty() || k.contains('/')) {
        return Err(DomainError::StoreRejected(format!(
            "only <collection>/<key> paths are supported, got '{path}'"
        )));
    }
    Ok((parent, key))
}

#[async_trait::async_trait]
impl StorePort for InMemoryStore {
    fn create_child(&self, path: &str) -> ChildRef {
        ChildRef::new(path.trim_matches('/'), self.ids.next_id())
    }

    async fn write(&self, child: &ChildRef, value: Value) -> Result<(), DomainError> {
        let mut data = self.data.lock().await;
        data.take_failure()?;
        let (parent, _) = split_path(&child.parent)?;
        let children = data.nodes.entry(parent.to_string()).or_default();
        if value.is_null() {
            children.remove(&child.key);
        } else {
            children.insert(child.key.clone(), value);
        }
        debug!(path = %child.path(), "memory store write");
        data.broadcast(parent);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), DomainError> {
        let mut data = self.data.lock().await;
        data.take_failure()?;
        let (parent, key) = split_path(path)?;
        let changed = match key {
            Some(key) => data
                .nodes
                .get_mut(parent)
                .is_some_and(|children| children.remove(key).is_some()),
            None => data.nodes.remove(parent).is_some_and(|c| !c.is_empty()),
        };
        debug!(path, changed, "memory store delete");
        if changed {
            data.broadcast(parent);
        }
        Ok(())
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription, DomainError> {
        let (parent, key) = split_path(path)?;
        if key.is_some() {
            return Err(DomainError::StoreRejected(format!(
                "subscriptions are per collection, got '{path}'"
            )));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let mut data = self.data.lock().await;
        // Receiver is alive, send cannot fail here.
        let _ = tx.send(Ok(data.snapshot(parent)));
        data.subscribers.push((parent.to_string(), tx));
        Ok(Subscription::new(parent, rx))
    }
}
