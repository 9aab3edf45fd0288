//! Expense and traveler collections mirrored from the store.
//!
//! - Mutations only dispatch store writes; local state changes solely through
//!   the subscription callbacks (no optimistic updates)
//! - Each snapshot replaces its collection wholesale, in store order
//! - Malformed children are skipped with a warning

use crate::domain::{
    EXPENSES_PATH, Expense, ExpenseRecord, LedgerView, RecordId, Snapshot, TRAVELERS_PATH,
    Traveler, TravelerRecord, TravelerView, compute_owed, total_amount,
};
use crate::ports::PresenterPort;
use crate::usecases::write_dispatcher::{PendingWrite, WriteDispatcher, WriteOp};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct RecordRepository {
    writer: WriteDispatcher,
    presenter: Arc<dyn PresenterPort>,
    expenses: Vec<Expense>,
    travelers: Vec<Traveler>,
}

impl RecordRepository {
    pub fn new(writer: WriteDispatcher, presenter: Arc<dyn PresenterPort>) -> Self {
        Self {
            writer,
            presenter,
            expenses: Vec::new(),
            travelers: Vec::new(),
        }
    }

    /// Create `expenses/<new id> = {category, amount}`. Returns immediately.
    pub fn add_expense(&self, category: &str, amount: u64) -> PendingWrite {
        let record = ExpenseRecord {
            category: category.to_string(),
            amount,
        };
        self.create(EXPENSES_PATH, &record)
    }

    /// Create `travelers/<new id> = {name}` with the trimmed name.
    /// Blank names are dropped without a write (`None`).
    pub fn add_traveler(&self, name: &str) -> Option<PendingWrite> {
        let name = name.trim();
        if name.is_empty() {
            debug!("skipping blank traveler name");
            return None;
        }
        let record = TravelerRecord {
            name: name.to_string(),
        };
        Some(self.create(TRAVELERS_PATH, &record))
    }

    pub fn delete_expense(&self, id: &RecordId) -> PendingWrite {
        self.writer.submit(WriteOp::Delete {
            path: format!("{}/{}", EXPENSES_PATH, id),
        })
    }

    pub fn remove_traveler(&self, id: &RecordId) -> PendingWrite {
        self.writer.submit(WriteOp::Delete {
            path: format!("{}/{}", TRAVELERS_PATH, id),
        })
    }

    /// Subscription callback for `expenses`.
    pub fn on_expenses_changed(&mut self, snapshot: &Snapshot) {
        self.expenses = decode_children::<ExpenseRecord>(snapshot)
            .map(|(id, record)| record.into_expense(id))
            .collect();
        debug!(count = self.expenses.len(), "expenses refreshed");
        self.refresh();
    }

    /// Subscription callback for `travelers`.
    pub fn on_travelers_changed(&mut self, snapshot: &Snapshot) {
        self.travelers = decode_children::<TravelerRecord>(snapshot)
            .map(|(id, record)| record.into_traveler(id))
            .collect();
        debug!(count = self.travelers.len(), "travelers refreshed");
        self.refresh();
    }

    /// Wait up to `timeout` for dispatched writes to finish. Returns how many
    /// are still running.
    pub async fn flush_writes(&self, timeout: Duration) -> usize {
        self.writer.drain(timeout).await
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn travelers(&self) -> &[Traveler] {
        &self.travelers
    }

    /// Current collections with the split and total computed from scratch.
    pub fn view(&self) -> LedgerView {
        let owed = compute_owed(&self.expenses, &self.travelers);
        LedgerView {
            expenses: self.expenses.clone(),
            travelers: self
                .travelers
                .iter()
                .map(|t| TravelerView {
                    id: t.id.clone(),
                    name: t.name.clone(),
                    amount_owed: owed.get(&t.id).copied(),
                })
                .collect(),
            total: total_amount(&self.expenses),
        }
    }

    fn refresh(&self) {
        self.presenter.render(&self.view());
    }

    fn create<T: serde::Serialize>(&self, path: &str, record: &T) -> PendingWrite {
        let child = self.writer.create_child(path);
        // Plain structs with string/integer fields always serialize.
        let value = serde_json::to_value(record).unwrap_or_default();
        self.writer.submit(WriteOp::Create { child, value })
    }
}

/// Decode every child of `snapshot` as `T`, skipping (and logging) bad ones.
fn decode_children<T: DeserializeOwned>(
    snapshot: &Snapshot,
) -> impl Iterator<Item = (RecordId, T)> + '_ {
    snapshot.children.iter().filter_map(|(key, value)| {
        match serde_json::from_value::<T>(value.clone()) {
            Ok(record) => Some((RecordId::new(key.clone()), record)),
            Err(e) => {
                warn!(path = %snapshot.path, key = %key, error = %e, "skipping malformed record");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::InMemoryStore;
    use crate::domain::{Notice, Owed};
    use crate::ports::StorePort;
    use crate::usecases::write_dispatcher::RetryPolicy;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct RecordingPresenter {
        views: Mutex<Vec<LedgerView>>,
    }

    impl RecordingPresenter {
        fn last(&self) -> LedgerView {
            self.views.lock().unwrap().last().cloned().unwrap_or_default()
        }

        fn renders(&self) -> usize {
            self.views.lock().unwrap().len()
        }
    }

    impl PresenterPort for RecordingPresenter {
        fn render(&self, view: &LedgerView) {
            self.views.lock().unwrap().push(view.clone());
        }

        fn notify(&self, _notice: &Notice) {}
    }

    fn repository(
        store: Arc<InMemoryStore>,
    ) -> (RecordRepository, Arc<RecordingPresenter>) {
        let presenter = Arc::new(RecordingPresenter::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let writer = WriteDispatcher::new(store, RetryPolicy::default(), tx);
        (RecordRepository::new(writer, presenter.clone()), presenter)
    }

    fn snapshot(path: &str, children: Vec<(&str, serde_json::Value)>) -> Snapshot {
        Snapshot::new(
            path,
            children
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_snapshot_replaces_collection_and_renders() {
        let (mut repo, presenter) = repository(Arc::new(InMemoryStore::new()));
        repo.on_expenses_changed(&snapshot(
            "expenses",
            vec![
                ("k1", json!({"category": "Food", "amount": 30})),
                ("k2", json!({"category": "Gas", "amount": 20})),
            ],
        ));
        repo.on_travelers_changed(&snapshot(
            "travelers",
            vec![("t1", json!({"name": "A"})), ("t2", json!({"name": "B"}))],
        ));

        assert_eq!(presenter.renders(), 2);
        let view = presenter.last();
        assert_eq!(view.total, 50);
        assert_eq!(view.expenses[0].id, RecordId::new("k1"));
        assert_eq!(view.expenses[1].category, "Gas");
        assert!(view
            .travelers
            .iter()
            .all(|t| t.amount_owed == Some(Owed::from_cents(2500))));

        repo.on_expenses_changed(&snapshot(
            "expenses",
            vec![("k2", json!({"category": "Gas", "amount": 20}))],
        ));
        assert_eq!(repo.expenses().len(), 1);
        assert_eq!(presenter.last().total, 20);
    }

    #[tokio::test]
    async fn test_redelivered_snapshot_is_idempotent() {
        let (mut repo, presenter) = repository(Arc::new(InMemoryStore::new()));
        let snap = snapshot(
            "travelers",
            vec![("t1", json!({"name": "A"})), ("t2", json!({"name": "B"}))],
        );
        repo.on_travelers_changed(&snap);
        let first = presenter.last();
        repo.on_travelers_changed(&snap);
        assert_eq!(presenter.last(), first);
        assert_eq!(repo.travelers().len(), 2);
    }

    #[tokio::test]
    async fn test_no_travelers_leaves_owed_unset() {
        let (mut repo, presenter) = repository(Arc::new(InMemoryStore::new()));
        repo.on_expenses_changed(&snapshot(
            "expenses",
            vec![("k1", json!({"category": "Food", "amount": 10}))],
        ));
        let view = presenter.last();
        assert_eq!(view.total, 10);
        assert!(view.travelers.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_children_are_skipped() {
        let (mut repo, _presenter) = repository(Arc::new(InMemoryStore::new()));
        repo.on_expenses_changed(&snapshot(
            "expenses",
            vec![
                ("k1", json!({"category": "Food"})),
                ("k2", json!({"category": "Gas", "amount": "lots"})),
                ("k3", json!("just a string")),
                ("k4", json!({"category": "Hotel", "amount": 80})),
            ],
        ));
        assert_eq!(repo.expenses().len(), 1);
        assert_eq!(repo.expenses()[0].id, RecordId::new("k4"));

        repo.on_travelers_changed(&snapshot(
            "travelers",
            vec![("t1", json!({"nickname": "A"})), ("t2", json!({"name": "B"}))],
        ));
        assert_eq!(repo.travelers().len(), 1);
        assert_eq!(repo.travelers()[0].name, "B");
    }

    #[tokio::test]
    async fn test_add_traveler_trims_and_skips_blank() {
        let store = Arc::new(InMemoryStore::new());
        let (repo, presenter) = repository(store.clone());

        assert!(repo.add_traveler("   ").is_none());
        let pending = repo.add_traveler(" Alice ").unwrap();
        pending.await.unwrap().unwrap();

        let stored = store.snapshot("travelers").await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.children[0].1, json!({"name": "Alice"}));
        // No local mutation: nothing rendered until a snapshot arrives.
        assert_eq!(presenter.renders(), 0);
        assert!(repo.travelers().is_empty());
    }

    #[tokio::test]
    async fn test_add_and_delete_expense_round_trip() {
        let store = Arc::new(InMemoryStore::new());
        let (mut repo, _presenter) = repository(store.clone());
        let mut sub = store.subscribe("expenses").await.unwrap();
        repo.on_expenses_changed(&sub.next().await.unwrap().unwrap());

        repo.add_expense("Food", 30).await.unwrap().unwrap();
        repo.on_expenses_changed(&sub.next().await.unwrap().unwrap());
        assert_eq!(repo.expenses().len(), 1);
        assert_eq!(repo.expenses()[0].category, "Food");
        assert_eq!(repo.expenses()[0].amount, 30);

        let id = repo.expenses()[0].id.clone();
        repo.delete_expense(&id).await.unwrap().unwrap();
        repo.on_expenses_changed(&sub.next().await.unwrap().unwrap());
        assert!(repo.expenses().is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_traveler_is_noop() {
        let store = Arc::new(InMemoryStore::new());
        let (repo, _presenter) = repository(store.clone());
        repo.add_traveler("A").unwrap().await.unwrap().unwrap();
        repo.remove_traveler(&RecordId::new("missing"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(store.snapshot("travelers").await.len(), 1);
    }
}
