//! HTTP API gateway for Switchyard.
//!
//! Exposes a health check and the v1 API for the profile registry and the
//! task lifecycle (submit, query, advance, supply, rework, cancel).
//!
//! Built on Axum; routing itself stays synchronous inside the handlers.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use switchyard_config::{AppConfig, GatewayConfig};
use switchyard_handoff::Dispatcher;

pub use api_v1::{ApiError, SharedApiState, status_for};

/// Request body limit for every route.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the full router: `/health` plus the v1 API under `/v1`.
///
/// Layers applied:
/// - CORS limited to the gateway's own origin
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedApiState, gateway: &GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(gateway))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(gateway: &GatewayConfig) -> CorsLayer {
    let origin = format!("http://{}:{}", gateway.host, gateway.port);
    let allow = match HeaderValue::from_str(&origin) {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            warn!(origin = %origin, "Invalid CORS origin, falling back to localhost");
            AllowOrigin::exact(HeaderValue::from_static("http://localhost"))
        }
    };
    CorsLayer::new()
        .allow_origin(allow)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
///
/// Loads the registry from `config`, so a bad profile document stops the
/// server before it binds.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let dispatcher = Arc::new(Dispatcher::from_config(&config)?);
    info!(
        profiles = dispatcher.registry().len(),
        "Profile registry loaded"
    );

    let app = build_router(dispatcher, &config.gateway);

    info!(addr = %addr, "Gateway starting with v1 API");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
