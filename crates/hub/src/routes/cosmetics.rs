//! Cosmetics inventory handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use serde::Serialize;

use libertad_hub_core::{CosmeticProduct, Expiry, NewCosmetic, now_ms};

use super::required_text;
use crate::{error::AppError, state::AppState};

/// Build the cosmetics router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cosmetics", get(list).post(create))
        .route("/api/cosmetics/{id}", delete(remove))
}

/// A product together with its expiry at request time.
#[derive(Debug, Serialize)]
pub struct CosmeticView {
    #[serde(flatten)]
    pub product: CosmeticProduct,
    pub expiry: Expiry,
}

pub async fn list(State(state): State<AppState>) -> Json<Vec<CosmeticView>> {
    let now = now_ms();
    let views = state
        .controller()
        .snapshot()
        .makeup
        .into_iter()
        .map(|product| CosmeticView {
            expiry: product.expiry(now),
            product,
        })
        .collect();
    Json(views)
}

/// Register a product.
///
/// # Errors
///
/// Returns `BadRequest` for a blank brand or name, or a PAO that is not a
/// positive number of months.
pub async fn create(
    State(state): State<AppState>,
    Json(mut body): Json<NewCosmetic>,
) -> Result<(StatusCode, Json<CosmeticView>), AppError> {
    body.brand = required_text("brand", &body.brand)?.to_string();
    body.name = required_text("name", &body.name)?.to_string();
    if !(body.pao_months.is_finite() && body.pao_months > 0.0) {
        return Err(AppError::BadRequest(
            "paoMonths must be a positive number".to_string(),
        ));
    }

    let product = state.controller().add_cosmetic(body);
    let view = CosmeticView {
        expiry: product.expiry(now_ms()),
        product,
    };
    Ok((StatusCode::CREATED, Json(view)))
}

/// Remove a product.
///
/// # Errors
///
/// Returns `NotFound` for an unknown id.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.controller().remove_cosmetic(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("cosmetic", &id))
    }
}
