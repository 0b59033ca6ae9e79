//! turnstream server
//!
//! Streams agent turns (reason, then optionally one tool) to HTTP clients as
//! incremental UI patches.

use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turnstream::api::{create_router, AppState};
use turnstream::config::Config;
use turnstream::llm::{AnthropicService, LlmService, LoggingService, UnavailableService};
use turnstream::runtime::{InMemoryTurnStore, TurnRuntime};
use turnstream::tools::ToolRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turnstream=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;

    let llm: Arc<dyn LlmService> = if config.has_backend() {
        let api_key = config
            .anthropic_api_key
            .clone()
            .unwrap_or_else(|| "implicit".to_string());
        let service = AnthropicService::new(api_key, config.model, config.gateway.as_deref())?;
        tracing::info!(
            model = service.model_id(),
            gateway = config.gateway.is_some(),
            "LLM backend initialized"
        );
        Arc::new(LoggingService::new(Arc::new(service)))
    } else {
        tracing::warn!("No LLM API keys configured. Set ANTHROPIC_API_KEY or LLM_GATEWAY.");
        Arc::new(UnavailableService)
    };

    let tools = Arc::new(ToolRegistry::standard());
    tracing::info!(tools = ?tools.names(), "Tool registry initialized");

    let runtime = TurnRuntime::new(llm, tools, config.runtime());
    let state = AppState::new(runtime, Arc::new(InMemoryTurnStore::new()));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("turnstream server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
