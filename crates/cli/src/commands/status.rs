//! Local and remote status report.

use tracing::{info, warn};

use libertad_hub::config::RemoteConfig;
use libertad_hub::store::JsonBinClient;
use libertad_hub_core::{Snapshot, WishlistCategory};

use super::open_local;

/// Report what is stored locally and whether the remote copy is reachable.
///
/// A failed remote fetch is reported, not returned as an error.
///
/// # Errors
///
/// Returns an error if the local store cannot be opened or the remote
/// configuration is invalid.
pub async fn run(offline: bool) -> Result<(), Box<dyn std::error::Error>> {
    let local = open_local()?;

    let snapshot = local.load();
    match &snapshot {
        Some(snapshot) => {
            info!(
                counts = %snapshot.counts(),
                last_updated = snapshot.last_updated,
                "Local snapshot"
            );
            for (category, total, open) in wishlist_by_category(snapshot) {
                info!(%category, total, open, "Wishlist");
            }
        }
        None => info!("No local snapshot"),
    }

    match local.load_identity() {
        Some(role) => {
            let unread = snapshot.as_ref().map_or(0, |s| s.unread_for(role));
            info!(%role, unread, "Selected identity");
        }
        None => info!("No identity selected"),
    }

    if offline {
        return Ok(());
    }

    let client = JsonBinClient::new(&RemoteConfig::from_env()?)?;
    match client.try_fetch_latest().await {
        Ok(snapshot) => info!(
            bin_id = client.bin_id(),
            counts = %snapshot.counts(),
            last_updated = snapshot.last_updated,
            "Remote snapshot"
        ),
        Err(e) => warn!(bin_id = client.bin_id(), error = %e, "Remote snapshot unavailable"),
    }

    Ok(())
}

/// Entries per category with how many are not completed, in display order.
fn wishlist_by_category(snapshot: &Snapshot) -> Vec<(WishlistCategory, usize, usize)> {
    WishlistCategory::ALL
        .into_iter()
        .map(|category| {
            let (total, open) = snapshot
                .wishlist
                .iter()
                .filter(|w| w.category_id == category)
                .fold((0, 0), |(total, open), w| {
                    (total + 1, open + usize::from(!w.is_completed))
                });
            (category, total, open)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use libertad_hub_core::WishlistItem;

    #[test]
    fn test_wishlist_by_category_covers_every_category() {
        let mut snapshot = Snapshot::default();
        let mut done = WishlistItem::new("Ramen", None, WishlistCategory::Restaurants, 1);
        done.toggle();
        snapshot.wishlist.push(done);
        snapshot
            .wishlist
            .push(WishlistItem::new("Sushi", None, WishlistCategory::Restaurants, 2));

        let rows = wishlist_by_category(&snapshot);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], (WishlistCategory::Plans, 0, 0));
        assert_eq!(rows[2], (WishlistCategory::Restaurants, 2, 1));
    }
}
