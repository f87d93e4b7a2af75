//! One-shot reconciliation.

use tracing::info;

use libertad_hub::config::HubConfig;
use libertad_hub::store::{FileStore, JsonBinClient, LocalStore};
use libertad_hub::AppController;
use libertad_hub_core::SyncStatus;

/// Run the startup sequence once and upload the merged snapshot.
///
/// # Errors
///
/// Returns an error if configuration is missing, the remote copy cannot be
/// fetched, or the upload fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = HubConfig::from_env()?;
    let local = LocalStore::new(FileStore::open(&config.data_dir)?);
    let remote = JsonBinClient::new(config.remote())?;

    let controller = AppController::start(local, remote, config.save_delay).await;
    if controller.status() == SyncStatus::Error {
        return Err("remote snapshot unavailable; local data left untouched".into());
    }

    if !controller.flush().await {
        return Err("merged snapshot could not be uploaded".into());
    }

    info!(counts = %controller.snapshot().counts(), "Sync complete");
    Ok(())
}
