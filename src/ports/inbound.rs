//! Inbound port. UI (adapter) calls into the application.

use crate::domain::{DomainError, Intent};
use tokio::sync::mpsc;

/// Input port: UI/CLI turns user actions into intents for the ledger loop.
#[async_trait::async_trait]
pub trait InputPort: Send + Sync {
    /// Collect intents until the user quits. Dropping `intents` (by returning)
    /// ends the ledger loop.
    async fn run(&self, intents: mpsc::Sender<Intent>) -> Result<(), DomainError>;
}
