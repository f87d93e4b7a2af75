//! HTTP route handlers for the hub.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Health check
//!
//! # Snapshot and persistence
//! GET    /api/snapshot                - Full snapshot plus status
//! GET    /api/status                  - Persistence status
//! POST   /api/reset                   - Wipe local and remote data
//!
//! # Identity
//! GET    /api/identity                - Selected identity
//! PUT    /api/identity                - Select identity
//! DELETE /api/identity                - Clear identity
//!
//! # Wishlist
//! GET    /api/wishlist                - Entries (optional ?category=)
//! POST   /api/wishlist                - Add entry
//! POST   /api/wishlist/{id}/toggle    - Flip completion
//! DELETE /api/wishlist/{id}           - Remove entry
//!
//! # Cosmetics
//! GET    /api/cosmetics               - Products with derived expiry
//! POST   /api/cosmetics               - Register product
//! DELETE /api/cosmetics/{id}          - Remove product
//!
//! # Mailbox
//! GET    /api/messages                - Messages, newest first, with unread count
//! POST   /api/messages                - Send as the selected identity
//! POST   /api/messages/{id}/read      - Mark read
//! ```

pub mod cosmetics;
pub mod identity;
pub mod messages;
pub mod sync;
pub mod wishlist;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Build the complete router with state applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(sync::router())
        .merge(identity::router())
        .merge(wishlist::router())
        .merge(cosmetics::router())
        .merge(messages::router())
        .with_state(state)
}

/// Liveness probe.
async fn health() -> &'static str {
    "ok"
}

/// Reject a blank required text field.
///
/// Returns the trimmed value.
pub(crate) fn required_text<'a>(field: &str, value: &'a str) -> Result<&'a str, crate::AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::AppError::BadRequest(format!(
            "{field} must not be empty"
        )));
    }
    Ok(trimmed)
}
