//! HTTP API v1 for the swarm service.
//!
//! Endpoints:
//!
//! - `GET    /v1/status`: client and store status
//! - `GET    /v1/users/{user_id}/swarm`: current swarm state
//! - `POST   /v1/users/{user_id}/swarm/run`: run the swarm for one week
//! - `POST   /v1/users/{user_id}/tasks/{task_id}/toggle`: flip one task
//! - `DELETE /v1/users/{user_id}/swarm`: reset to uninitialized
//! - `POST   /v1/generate/stream`: SSE text stream

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    response::sse::{Event as SseEvent, Sse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use careerswarm_core::error::{Error, GenerationError};
use careerswarm_core::{AgentRole, SwarmState, UserProfile};
use careerswarm_providers::{ClientStats, GenerationOptions};
use careerswarm_swarm::SwarmService;

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiV1State {
    pub service: SwarmService,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl ApiV1State {
    pub fn new(service: SwarmService) -> Self {
        Self {
            service,
            start_time: chrono::Utc::now(),
        }
    }
}

pub type SharedApiState = Arc<ApiV1State>;

/// Build the v1 API router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route(
            "/users/{user_id}/swarm",
            get(get_swarm_handler).delete(reset_handler),
        )
        .route("/users/{user_id}/swarm/run", post(run_handler))
        .route("/users/{user_id}/tasks/{task_id}/toggle", post(toggle_handler))
        .route("/generate/stream", post(generate_stream_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    provider: String,
    model: String,
    store: String,
    uptime_secs: i64,
    stats: ClientStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunResponse {
    run_id: String,
    state: SwarmState,
    degraded_agents: Vec<AgentRole>,
    fallback_plan: bool,
    cached_replies: usize,
    duration_ms: u128,
}

#[derive(Serialize)]
struct ResetResponse {
    reset: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamRequest {
    prompt: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    system_instruction: Option<String>,
}

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map a domain error onto an HTTP status.
fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::TaskNotFound(_) => StatusCode::NOT_FOUND,
        Error::Generation(e) => generation_status(e),
        Error::Store(_)
        | Error::Config { .. }
        | Error::Serialization(_)
        | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn generation_status(err: &GenerationError) -> StatusCode {
    match err {
        GenerationError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        GenerationError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        GenerationError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        GenerationError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        GenerationError::Network { .. }
        | GenerationError::EmptyResponse
        | GenerationError::InvalidJson(_) => StatusCode::BAD_GATEWAY,
    }
}

fn into_api_error(err: Error) -> ApiError {
    let status = error_status(&err);
    if status.is_server_error() {
        warn!(status = status.as_u16(), error = %err, "Request failed");
    }
    api_error(status, err.to_string())
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// `GET /v1/status`
async fn status_handler(State(state): State<SharedApiState>) -> Json<StatusResponse> {
    let client = state.service.coordinator().client();
    Json(StatusResponse {
        provider: client.provider_name().to_string(),
        model: client.settings().model.clone(),
        store: state.service.store().name().to_string(),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
        stats: client.stats(),
    })
}

/// `GET /v1/users/{user_id}/swarm`
async fn get_swarm_handler(
    State(state): State<SharedApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<SwarmState>, ApiError> {
    match state.service.state(&user_id).await.map_err(into_api_error)? {
        Some(swarm) => Ok(Json(swarm)),
        None => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("No swarm state for user '{user_id}'"),
        )),
    }
}

/// `POST /v1/users/{user_id}/swarm/run`
async fn run_handler(
    State(state): State<SharedApiState>,
    Path(user_id): Path<String>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<RunResponse>, ApiError> {
    info!(user_id = %user_id, "v1/swarm/run request");

    let run = state
        .service
        .run(&user_id, &profile)
        .await
        .map_err(into_api_error)?;

    Ok(Json(RunResponse {
        run_id: run.run_id.to_string(),
        degraded_agents: run.degraded,
        fallback_plan: run.fallback_plan,
        cached_replies: run.cached_replies,
        duration_ms: run.duration.as_millis(),
        state: run.state,
    }))
}

/// `POST /v1/users/{user_id}/tasks/{task_id}/toggle`
async fn toggle_handler(
    State(state): State<SharedApiState>,
    Path((user_id, task_id)): Path<(String, String)>,
) -> Result<Json<SwarmState>, ApiError> {
    state
        .service
        .toggle_task(&user_id, &task_id)
        .await
        .map(Json)
        .map_err(into_api_error)
}

/// `DELETE /v1/users/{user_id}/swarm`
async fn reset_handler(
    State(state): State<SharedApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    let reset = state
        .service
        .reset(&user_id)
        .await
        .map_err(into_api_error)?;
    Ok(Json(ResetResponse { reset }))
}

// ── SSE Streaming ─────────────────────────────────────────────────────────

/// `POST /v1/generate/stream`: stream completion text as SSE `chunk`
/// events, then a final `done` event. A failure mid-stream is sent as an
/// `error` event.
async fn generate_stream_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<StreamRequest>,
) -> Result<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    if payload.prompt.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "prompt must not be empty"));
    }

    let mut options = GenerationOptions::default();
    if let Some(model) = payload.model {
        options = options.with_model(model);
    }
    if let Some(temperature) = payload.temperature {
        options = options.with_temperature(temperature);
    }
    if let Some(instruction) = payload.system_instruction {
        options = options.with_system_instruction(instruction);
    }

    let chunks = state
        .service
        .coordinator()
        .client()
        .generate_stream(&payload.prompt, &options)
        .await
        .map_err(|e| into_api_error(e.into()))?;

    let stream = chunks
        .map(|chunk| {
            Ok::<_, Infallible>(match chunk {
                Ok(text) => SseEvent::default().event("chunk").data(strip_cr(&text)),
                Err(e) => SseEvent::default()
                    .event("error")
                    .data(strip_cr(&e.to_string())),
            })
        })
        .chain(tokio_stream::once(Ok(SseEvent::default()
            .event("done")
            .data(""))));

    Ok(Sse::new(stream))
}

// SSE data lines may not carry carriage returns.
fn strip_cr(text: &str) -> String {
    text.replace('\r', "")
}
