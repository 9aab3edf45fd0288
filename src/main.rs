//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here; the ledger loop owns all record state.

use dotenv::dotenv;
use road_wallet::adapters::store::{FirebaseStore, InMemoryStore};
use road_wallet::adapters::ui::presenter::ConsolePresenter;
use road_wallet::adapters::ui::progress::wait_for_first_sync;
use road_wallet::adapters::ui::tui::TuiInputPort;
use road_wallet::ports::{InputPort, PresenterPort, StorePort};
use road_wallet::shared::config::AppConfig;
use road_wallet::usecases::LedgerService;
use anyhow::Context;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Intents buffered between the prompt thread and the ledger loop.
const INTENT_QUEUE_SIZE: usize = 32;

/// How long the startup spinner waits for the first snapshot.
const FIRST_SYNC_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenv();
    // Logs go to stderr so they don't interleave with prompts on stdout.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!("no .env found"),
    }

    road_wallet::adapters::ui::init_ui();

    let cfg = AppConfig::load().context("invalid ROAD_WALLET_* configuration")?;

    // --- Store: hosted database when ROAD_WALLET_DB is set, otherwise in-process ---
    let (store, endpoint): (Arc<dyn StorePort>, String) = match cfg.database_url() {
        Some(url) => {
            info!(url = %url, "using realtime database");
            (Arc::new(FirebaseStore::new(url.clone())), url)
        }
        None => {
            warn!("ROAD_WALLET_DB not set, using in-memory store (nothing is shared or saved)");
            (Arc::new(InMemoryStore::new()), "in-memory store".to_string())
        }
    };

    // --- Presentation ---
    let (presenter, feed) = ConsolePresenter::new();
    let presenter: Arc<dyn PresenterPort> = Arc::new(presenter);
    let views = feed.views();
    let feed = Arc::new(Mutex::new(feed));

    // --- Ledger loop (owns the repository; ends when the intent channel closes) ---
    let retry = cfg.retry_policy();
    info!(
        attempts = retry.max_attempts,
        backoff_ms = retry.base_delay.as_millis() as u64,
        "write retry policy"
    );
    let ledger =
        LedgerService::new(store, presenter, retry).with_shutdown_grace(cfg.shutdown_grace());
    let (intent_tx, intent_rx) = mpsc::channel(INTENT_QUEUE_SIZE);
    let ledger_task = tokio::spawn(ledger.run(intent_rx));

    wait_for_first_sync(views, &endpoint, FIRST_SYNC_TIMEOUT).await;

    // --- Run prompts until Quit ---
    let input: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(Arc::clone(&feed)));
    let input_result = input.run(intent_tx).await;

    // The ledger drains pending writes before it returns.
    let ledger_result = ledger_task
        .await
        .map_err(|e| anyhow::anyhow!("ledger task failed: {}", e))?;
    if let Ok(mut feed) = feed.lock() {
        feed.flush();
    }
    ledger_result.map_err(|e| anyhow::anyhow!("{}", e))?;
    input_result.map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
