//! Snapshot, status and reset handlers.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use tracing::instrument;

use libertad_hub_core::{Snapshot, SyncStatus};

use crate::{error::AppError, state::AppState};

/// Build the snapshot router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/snapshot", get(snapshot))
        .route("/api/status", get(status))
        .route("/api/reset", post(reset))
}

/// Full snapshot with the persistence status alongside.
#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub status: SyncStatus,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: SyncStatus,
}

pub async fn snapshot(State(state): State<AppState>) -> Json<SnapshotResponse> {
    let controller = state.controller();
    Json(SnapshotResponse {
        status: controller.status(),
        snapshot: controller.snapshot(),
    })
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.controller().status(),
    })
}

/// Wipe every collection locally and remotely.
///
/// # Errors
///
/// Returns `Upstream` when the remote store rejects the empty snapshot. The
/// local data is already gone at that point.
#[instrument(skip(state))]
pub async fn reset(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let controller = state.controller();
    if controller.reset().await {
        Ok(Json(StatusResponse {
            status: controller.status(),
        }))
    } else {
        Err(AppError::Upstream(
            "remote store rejected the reset".to_string(),
        ))
    }
}
