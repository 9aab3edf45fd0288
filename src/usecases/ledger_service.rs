//! Ledger loop: the single task that owns the repository.
//!
//! Subscribes to both collections, then multiplexes store notifications,
//! user intents and write-failure notices one at a time until the user quits
//! or the intent channel closes. On exit the subscriptions are dropped and
//! writes still in flight get a grace period to land.

use crate::domain::{DomainError, EXPENSES_PATH, Intent, Notice, TRAVELERS_PATH};
use crate::ports::{PresenterPort, StorePort};
use crate::usecases::record_repository::RecordRepository;
use crate::usecases::write_dispatcher::{RetryPolicy, WriteDispatcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// How long quitting waits for in-flight writes by default.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub struct LedgerService {
    store: Arc<dyn StorePort>,
    presenter: Arc<dyn PresenterPort>,
    repository: RecordRepository,
    notices: mpsc::UnboundedReceiver<Notice>,
    shutdown_grace: Duration,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn StorePort>,
        presenter: Arc<dyn PresenterPort>,
        retry: RetryPolicy,
    ) -> Self {
        let (notice_tx, notices) = mpsc::unbounded_channel();
        let writer = WriteDispatcher::new(Arc::clone(&store), retry, notice_tx);
        let repository = RecordRepository::new(writer, Arc::clone(&presenter));
        Self {
            store,
            presenter,
            repository,
            notices,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Upper bound on how long `run` waits for pending writes after quitting.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Run until `Intent::Quit` or until every intent sender is dropped.
    pub async fn run(mut self, mut intents: mpsc::Receiver<Intent>) -> Result<(), DomainError> {
        let mut expenses = self.store.subscribe(EXPENSES_PATH).await?;
        let mut travelers = self.store.subscribe(TRAVELERS_PATH).await?;
        info!("ledger started");

        loop {
            tokio::select! {
                Some(item) = expenses.next() => match item {
                    Ok(snapshot) => self.repository.on_expenses_changed(&snapshot),
                    Err(e) => self.feed_ended(EXPENSES_PATH, e),
                },
                Some(item) = travelers.next() => match item {
                    Ok(snapshot) => self.repository.on_travelers_changed(&snapshot),
                    Err(e) => self.feed_ended(TRAVELERS_PATH, e),
                },
                Some(notice) = self.notices.recv() => {
                    self.presenter.notify(&notice);
                }
                intent = intents.recv() => match intent {
                    Some(Intent::Quit) | None => break,
                    Some(intent) => self.handle(intent),
                },
            }
        }

        drop(expenses);
        drop(travelers);
        debug!("unsubscribed");

        let unsaved = self.repository.flush_writes(self.shutdown_grace).await;
        while let Ok(notice) = self.notices.try_recv() {
            self.presenter.notify(&notice);
        }
        if unsaved > 0 {
            warn!(unsaved, "quitting with writes still pending");
            self.presenter.notify(&Notice::new(format!(
                "{} change(s) may not have been saved",
                unsaved
            )));
        }
        info!("ledger stopped");
        Ok(())
    }

    /// A subscription gave up; the view for `path` no longer updates.
    fn feed_ended(&self, path: &str, e: DomainError) {
        error!(path, error = %e, "live updates stopped");
        self.presenter.notify(&Notice::new(format!(
            "Live updates for {} stopped: {}",
            path, e
        )));
    }

    /// Dispatch one intent. Writes are not awaited; their effect arrives
    /// through the subscriptions.
    fn handle(&self, intent: Intent) {
        debug!(?intent, "intent");
        match intent {
            Intent::SubmitExpense { category, amount } => {
                let _ = self.repository.add_expense(&category, amount);
            }
            Intent::SubmitTraveler { name } => {
                if self.repository.add_traveler(&name).is_none() {
                    debug!("blank traveler name ignored");
                }
            }
            Intent::DeleteExpense(id) => {
                let _ = self.repository.delete_expense(&id);
            }
            Intent::RemoveTraveler(id) => {
                let _ = self.repository.remove_traveler(&id);
            }
            Intent::Quit => warn!("quit reached intent handler"),
        }
    }
}
