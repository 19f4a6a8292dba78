mod commands;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod orchestrator;
mod routes;
mod search;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::browser::BrowserFetcher;
use crate::extraction::static_fetch::StaticFetcher;
use crate::extraction::ContentExtractor;
use crate::llm_client::LlmClient;
use crate::orchestrator::Orchestrator;
use crate::routes::build_router;
use crate::search::client::SearchClient;
use crate::search::facets::FacetTables;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobScout API v{}", env!("CARGO_PKG_VERSION"));

    // Facet tables are built once and only ever read
    let tables = Arc::new(FacetTables::builtin());

    // Initialize LLM client
    let llm = LlmClient::new(
        config.llm_api_key.clone(),
        config.llm_api_url.clone(),
        config.llm_model.clone(),
    )?;
    info!("LLM client initialized (model: {})", llm.model());

    // Initialize job board client
    let board = SearchClient::new(config.search_api_url.clone())?;
    info!("Search client initialized ({})", config.search_api_url);

    // Initialize content extraction (static HTTP + headless browser)
    let static_fetcher = StaticFetcher::new()?;
    let browser_fetcher = BrowserFetcher::new(
        config.chrome_path.clone(),
        Duration::from_secs(config.browser_timeout_secs),
    );
    let extractor = ContentExtractor::new(
        Arc::new(static_fetcher),
        Arc::new(browser_fetcher),
        config.dynamic_domains.clone(),
    );
    info!("Dynamic fetch domains: {:?}", config.dynamic_domains);

    let orchestrator = Orchestrator::new(
        Arc::new(llm),
        Arc::new(board),
        Arc::new(extractor),
        tables,
        config.max_results,
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        orchestrator: Arc::new(orchestrator),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
