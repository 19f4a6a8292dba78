//! Axum route handlers for the search and analysis API.

use std::future::Future;
use std::time::Duration;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::llm_client::LlmError;
use crate::orchestrator::OrchestrationResult;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchProtocol {
    ToolCalling,
    #[default]
    PromptJson,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub message: String,
    #[serde(default)]
    pub protocol: SearchProtocol,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct OrchestrationResponse {
    pub answer: String,
    /// `answer` split into chat-message-sized pieces.
    pub chunks: Vec<String>,
    pub result: OrchestrationResult,
}

impl OrchestrationResponse {
    fn new(result: OrchestrationResult, chunk_chars: usize) -> Self {
        Self {
            answer: result.final_text.clone(),
            chunks: result.chunks(chunk_chars),
            result,
        }
    }
}

/// Runs a pipeline under the request deadline. Dropping the future on expiry
/// tears down whatever it holds, browser sessions included.
pub async fn with_deadline<T, F>(secs: u64, pipeline: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, LlmError>>,
{
    match tokio::time::timeout(Duration::from_secs(secs), pipeline).await {
        Ok(outcome) => outcome.map_err(AppError::from),
        Err(_) => Err(AppError::Timeout(secs)),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/search
///
/// Turns a free-text job request into a search and a written recommendation.
pub async fn handle_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<OrchestrationResponse>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::Validation("message cannot be empty".to_string()));
    }

    let orchestrator = &state.orchestrator;
    let message = request.message.trim();
    let result = match request.protocol {
        SearchProtocol::ToolCalling => {
            with_deadline(
                state.config.request_timeout_secs,
                orchestrator.search_with_tools(message),
            )
            .await?
        }
        SearchProtocol::PromptJson => {
            with_deadline(
                state.config.request_timeout_secs,
                orchestrator.search_with_prompt_json(message),
            )
            .await?
        }
    };

    Ok(Json(OrchestrationResponse::new(
        result,
        state.config.message_chunk_chars,
    )))
}

/// POST /api/v1/analyze
///
/// Analysis report for a job description or a posting URL.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<OrchestrationResponse>, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError::Validation("query cannot be empty".to_string()));
    }

    let result = with_deadline(
        state.config.request_timeout_secs,
        state.orchestrator.analyze(request.query.trim()),
    )
    .await?;

    Ok(Json(OrchestrationResponse::new(
        result,
        state.config.message_chunk_chars,
    )))
}
