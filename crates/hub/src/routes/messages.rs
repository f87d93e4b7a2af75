//! Mailbox handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use libertad_hub_core::{Message, UserRole};

use super::required_text;
use crate::{error::AppError, state::AppState};

/// Build the mailbox router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/messages", get(list).post(send))
        .route("/api/messages/{id}/read", post(mark_read))
}

#[derive(Debug, Serialize)]
pub struct MailboxResponse {
    /// Newest first.
    pub messages: Vec<Message>,
    /// Unread messages from the other identity; zero without an identity.
    pub unread: usize,
    pub identity: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

pub async fn list(State(state): State<AppState>) -> Json<MailboxResponse> {
    let controller = state.controller();
    let identity = controller.identity();
    let snapshot = controller.snapshot();
    let unread = identity.map_or(0, |role| snapshot.unread_for(role));

    Json(MailboxResponse {
        messages: snapshot.mailbox,
        unread,
        identity,
    })
}

/// Post a message as the selected identity.
///
/// # Errors
///
/// Returns `BadRequest` for blank text and `Conflict` when no identity is
/// selected.
pub async fn send(
    State(state): State<AppState>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let text = required_text("text", &body.text)?;
    state
        .controller()
        .send_message(text)
        .map(|message| (StatusCode::CREATED, Json(message)))
        .ok_or_else(|| AppError::Conflict("no identity selected".to_string()))
}

/// Mark a message read.
///
/// # Errors
///
/// Returns `NotFound` for an unknown id.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Message>, AppError> {
    state
        .controller()
        .mark_message_read(&id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("message", &id))
}
