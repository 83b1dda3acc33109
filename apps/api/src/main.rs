mod alignment;
mod config;
mod document;
mod errors;
mod intake;
mod llm_client;
mod models;
mod parsing;
mod resume;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{CompletionProvider, LlmClient};
use crate::resume::Pipeline;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize completion client (absent without credentials)
    let provider: Option<Arc<dyn CompletionProvider>> =
        match LlmClient::from_api_key(config.anthropic_api_key.as_deref())? {
            Some(client) => {
                info!("LLM client initialized (model: {})", llm_client::MODEL);
                Some(Arc::new(client) as Arc<dyn CompletionProvider>)
            }
            None => {
                warn!("ANTHROPIC_API_KEY not set; alignment will use deterministic fallback");
                None
            }
        };

    // Build the pipeline once; shared read-only across requests
    let pipeline = Pipeline::from_config(&config, provider);
    info!(
        "Pipeline ready: timeout={}s backoff={}ms prefer_caller_fields={} explicit_empty_overrides={}",
        config.request_timeout_secs,
        config.rate_limit_backoff_ms,
        config.prefer_caller_fields,
        config.explicit_empty_overrides
    );

    let state = AppState::new(config.clone(), pipeline);

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: restrict allowed origins once the web client's domain is fixed
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
