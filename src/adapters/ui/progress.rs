//! Startup spinner shown until the first snapshot has been rendered.

use crate::domain::LedgerView;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// Spin while waiting for the first render. Gives up quietly after `timeout`
/// (the ledger keeps syncing in the background).
pub async fn wait_for_first_sync(
    mut views: watch::Receiver<LedgerView>,
    endpoint: &str,
    timeout: Duration,
) {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.yellow} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Syncing with {}", endpoint));
    spinner.enable_steady_tick(Duration::from_millis(100));

    match tokio::time::timeout(timeout, views.changed()).await {
        Ok(Ok(())) => spinner.finish_and_clear(),
        Ok(Err(_)) => spinner.abandon_with_message("ledger stopped before first sync"),
        Err(_) => {
            warn!(endpoint, timeout_secs = timeout.as_secs(), "first sync is taking long");
            spinner.abandon_with_message("Still syncing in the background");
        }
    }
}
