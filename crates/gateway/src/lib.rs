//! HTTP API gateway for careerswarm.
//!
//! Exposes a health check and the v1 API: swarm runs, task toggles,
//! resets, client status, and streamed generation.
//!
//! Built on Axum.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use careerswarm_config::AppConfig;
use careerswarm_swarm::{AgentRegistry, SwarmCoordinator, SwarmService};

pub use api_v1::{ApiV1State, SharedApiState};

/// Largest accepted request body. Profiles with a pasted resume fit well
/// inside this.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the full router: `/health` plus the v1 API under `/v1`.
///
/// Layers applied:
/// - CORS restricted to the local UI origin
/// - Request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(HeaderValue::from_static(
            "http://localhost:8080",
        )))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Build the service from configuration and serve until the listener fails.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let client = Arc::new(careerswarm_providers::build_from_config(&config));
    let store = careerswarm_store::build_from_config(&config).await?;
    let coordinator = SwarmCoordinator::new(client, AgentRegistry::new());
    let service = SwarmService::new(coordinator, store);

    info!(
        addr = %addr,
        model = %config.generation.model,
        store = service.store().name(),
        "Gateway starting"
    );

    let app = build_router(Arc::new(ApiV1State::new(service)));
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
