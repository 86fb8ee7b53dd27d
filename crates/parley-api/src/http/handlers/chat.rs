//! Chat list, conversation view, and REST message send.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use parley_types::id::UserId;
use parley_types::message::{ChatSummary, Message};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// `GET /api/v1/chats/{user_id}`
///
/// One summary row per conversation partner, most recent first. Fails
/// closed: a store error surfaces as an error response, never as an empty
/// chat list.
pub async fn get_chat_summaries(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ChatSummary>>>, AppError> {
    let summaries = state.summaries.summarize(&UserId::new(user_id)).await?;
    Ok(Json(ApiResponse::success(summaries)))
}

/// `GET /api/v1/conversations/{user_id}/{partner_id}`
///
/// Full history between the two users, oldest first.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path((user_id, partner_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Vec<Message>>>, AppError> {
    let messages = state
        .summaries
        .conversation(&UserId::new(user_id), &UserId::new(partner_id))
        .await?;
    Ok(Json(ApiResponse::success(messages)))
}

/// Request body for `POST /api/v1/messages`.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub sender: String,
    pub receiver: String,
    pub content: String,
}

/// `POST /api/v1/messages`
///
/// Persist and relay a message over REST; live subscribers still get
/// their `receiveMessage`/`refreshChatList` events exactly as if it had
/// arrived through the socket.
pub async fn send_message(
    State(state): State<AppState>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Message>>), AppError> {
    let message = state
        .relay
        .send_message(
            &UserId::new(body.sender),
            &UserId::new(body.receiver),
            &body.content,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(message))))
}
