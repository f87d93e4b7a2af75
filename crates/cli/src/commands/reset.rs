//! Destructive reset.

use tracing::warn;

use libertad_hub::config::RemoteConfig;
use libertad_hub::store::JsonBinClient;
use libertad_hub_core::{Snapshot, now_ms};

use super::open_local;

/// Overwrite both stores with an empty snapshot.
///
/// # Errors
///
/// Returns an error without touching anything when `confirmed` is false, or
/// when the remote store rejects the empty snapshot (the local copy is
/// already empty by then).
pub async fn run(confirmed: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !confirmed {
        return Err("reset deletes every wishlist entry, product and message; pass --yes".into());
    }

    let local = open_local()?;
    let client = JsonBinClient::new(&RemoteConfig::from_env()?)?;

    let empty = Snapshot::empty(now_ms());
    local.save(&empty);
    client.try_save_latest(&empty).await?;

    warn!(bin_id = client.bin_id(), "All data reset");
    Ok(())
}
