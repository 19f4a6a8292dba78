use std::sync::Arc;

use crate::config::Config;
use crate::orchestrator::Orchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Owns the LLM backend, job board, extractor, and facet tables.
    pub orchestrator: Arc<Orchestrator>,
}
