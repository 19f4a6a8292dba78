use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Timeout(secs) => {
                tracing::warn!("Request timed out after {secs}s");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "TIMEOUT",
                    format!("The request did not finish within {secs} seconds"),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Failure kinds of a chat command, turned into a reply by `user_message`.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    NotFound(String),

    #[error("missing argument '{0}'")]
    MissingArgument(String),

    #[error("caller lacks a permitted role")]
    MissingPermission,

    #[error("command failed: {0}")]
    Other(String),
}

impl CommandError {
    /// The text shown to the chat user.
    pub fn user_message(&self) -> String {
        match self {
            CommandError::NotFound(name) => format!("找不到指令：{name}"),
            CommandError::MissingArgument(param) => format!("缺少必要參數：{param}"),
            CommandError::MissingPermission => "你沒有權限執行此指令。".to_string(),
            CommandError::Other(message) => format!("執行指令時發生錯誤：{message}"),
        }
    }
}

impl From<AppError> for CommandError {
    fn from(e: AppError) -> Self {
        CommandError::Other(e.to_string())
    }
}
