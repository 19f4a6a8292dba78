//! Axum route handler for chat-command relays.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::commands::reply_to;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub content: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// Messages to post back, in order. Empty when the input was not a command.
    pub replies: Vec<String>,
}

/// POST /api/v1/commands
pub async fn handle_command(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    if request.content.trim().is_empty() {
        return Err(AppError::Validation("content cannot be empty".to_string()));
    }

    let replies = reply_to(&state, &request.content, &request.roles).await;
    Ok(Json(CommandResponse { replies }))
}
