pub mod health;

use axum::{
    http::Uri,
    routing::{get, post},
    Router,
};

use crate::commands::handlers as commands;
use crate::errors::AppError;
use crate::orchestrator::handlers as orchestrator;
use crate::state::AppState;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/search", post(orchestrator::handle_search))
        .route("/api/v1/analyze", post(orchestrator::handle_analyze))
        .route("/api/v1/commands", post(commands::handle_command))
        .fallback(not_found)
        .with_state(state)
}
