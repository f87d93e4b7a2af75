//! Identity selection handlers.
//!
//! Choosing an identity is not authenticated; it only decides who new
//! messages come from.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

use libertad_hub_core::UserRole;

use crate::state::AppState;

/// Build the identity router.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/identity",
        get(current).put(select).delete(clear),
    )
}

#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct SelectIdentityRequest {
    pub role: UserRole,
}

pub async fn current(State(state): State<AppState>) -> Json<IdentityResponse> {
    Json(IdentityResponse {
        role: state.controller().identity(),
    })
}

pub async fn select(
    State(state): State<AppState>,
    Json(body): Json<SelectIdentityRequest>,
) -> Json<IdentityResponse> {
    state.controller().select_identity(body.role);
    Json(IdentityResponse {
        role: Some(body.role),
    })
}

pub async fn clear(State(state): State<AppState>) -> StatusCode {
    state.controller().clear_identity();
    StatusCode::NO_CONTENT
}
