//! Cosmetics expiry report.

use chrono::DateTime;
use tracing::info;

use libertad_hub_core::{ExpiryStatus, now_ms};

use super::open_local;

/// List products by how much of their period after opening is used up.
///
/// Only products in `warning` or `expired` state are listed unless `all`.
///
/// # Errors
///
/// Returns an error if the local store cannot be opened.
pub fn run(all: bool) -> Result<(), Box<dyn std::error::Error>> {
    let local = open_local()?;
    let now = now_ms();

    let mut products: Vec<_> = local
        .load()
        .unwrap_or_default()
        .makeup
        .into_iter()
        .map(|product| {
            let expiry = product.expiry(now);
            (product, expiry)
        })
        .filter(|(_, expiry)| all || expiry.status != ExpiryStatus::Fresh)
        .collect();
    products.sort_by(|(_, a), (_, b)| b.percent.total_cmp(&a.percent));

    if products.is_empty() {
        info!("Nothing to report");
        return Ok(());
    }

    for (product, expiry) in &products {
        let expires = DateTime::from_timestamp_millis(expiry.expires_at)
            .map_or_else(|| "unknown".to_string(), |d| d.format("%Y-%m-%d").to_string());
        info!(
            brand = %product.brand,
            name = %product.name,
            category = %product.category,
            status = %expiry.status,
            percent = format_args!("{:.0}", expiry.percent),
            expires = %expires,
            "Cosmetic"
        );
    }

    Ok(())
}
