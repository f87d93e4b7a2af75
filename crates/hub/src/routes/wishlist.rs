//! Wishlist handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::Deserialize;

use libertad_hub_core::{WishlistCategory, WishlistItem};

use super::required_text;
use crate::{error::AppError, state::AppState};

/// Build the wishlist router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/wishlist", get(list).post(create))
        .route("/api/wishlist/{id}/toggle", post(toggle))
        .route("/api/wishlist/{id}", delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<WishlistCategory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWishlistItem {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category_id: WishlistCategory,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<WishlistItem>> {
    let items = state
        .controller()
        .snapshot()
        .wishlist
        .into_iter()
        .filter(|item| query.category.is_none_or(|c| item.category_id == c))
        .collect();
    Json(items)
}

/// Add an entry at the top of the list.
///
/// # Errors
///
/// Returns `BadRequest` for a blank title.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateWishlistItem>,
) -> Result<(StatusCode, Json<WishlistItem>), AppError> {
    let title = required_text("title", &body.title)?;
    let item = state
        .controller()
        .add_wishlist_item(title, body.description, body.category_id);
    Ok((StatusCode::CREATED, Json(item)))
}

/// Flip completion of an entry.
///
/// # Errors
///
/// Returns `NotFound` for an unknown id.
pub async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WishlistItem>, AppError> {
    state
        .controller()
        .toggle_wishlist_item(&id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("wishlist item", &id))
}

/// Remove an entry.
///
/// # Errors
///
/// Returns `NotFound` for an unknown id.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.controller().delete_wishlist_item(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("wishlist item", &id))
    }
}
