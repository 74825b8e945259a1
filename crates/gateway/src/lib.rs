//! HTTP front-end for Murmur.
//!
//! Serves the browser chat page and a small JSON API over the shared
//! conversation engine. Built on Axum.

pub mod api;
pub mod frontend;

#[cfg(test)]
pub(crate) mod test_support;

use axum::extract::{DefaultBodyLimit, State};
use axum::{Router, response::Json, routing::get};
use murmur_agent::{ConversationEngine, EngineState};
use murmur_config::AppConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Shared application state for the gateway.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConversationEngine>,
}

/// Build the router with every gateway route.
///
/// Layers applied:
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(engine: Arc<ConversationEngine>) -> Router {
    let state = AppState { engine };

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .merge(api::api_router(state))
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server and run until Ctrl+C.
pub async fn start(config: &AppConfig, engine: Arc<ConversationEngine>) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let app = build_router(engine.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, provider = engine.provider_name(), "Gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.speech().stop();
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    engine: &'static str,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        engine: match state.engine.state() {
            EngineState::Idle => "idle",
            EngineState::Processing => "processing",
        },
    })
}
