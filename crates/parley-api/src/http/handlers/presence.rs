//! Presence snapshot endpoint.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use parley_types::id::UserId;
use parley_types::presence::PresenceStatus;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Wire shape for `GET /api/v1/presence/{user_id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceView {
    pub user_id: UserId,
    pub status: PresenceStatus,
    pub last_seen: Option<DateTime<Utc>>,
}

/// `GET /api/v1/presence/{user_id}`
///
/// The live in-memory record when this process has seen the user,
/// otherwise whatever the user store remembers; 404 for a user neither
/// knows about.
pub async fn get_presence(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<PresenceView>>, AppError> {
    let user_id = UserId::new(user_id);
    let (status, last_seen) = state
        .presence
        .presence_of(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no presence for user '{user_id}'")))?;

    Ok(Json(ApiResponse::success(PresenceView {
        user_id,
        status,
        last_seen,
    })))
}
