//! HTTP server.
//!
//! Exposes the pipeline over a small JSON API:
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | `POST` | `/estimate` | `{"query": "..."}` | final `WorkflowState` |
//! | `GET` | `/health` | | `{"status", "version"}` |
//! | `GET` | `/status` | | which providers are configured |
//!
//! A run that ends in a terminal pipeline error is still `200 OK`; the
//! caller reads the state's `error` field. Only malformed requests are
//! rejected, with the error envelope:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```

use arbitration_core::state::WorkflowState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::pipeline::Pipeline;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Build the router with all routes and CORS.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/estimate", post(handle_estimate))
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .layer(cors)
        .with_state(AppState { pipeline })
}

/// Serve on `[server].bind` until the process is terminated.
pub async fn run_server(pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let bind_addr = pipeline.config().server.bind.clone();
    let app = router(pipeline);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "estimator listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ POST /estimate ============

#[derive(Deserialize)]
struct EstimateRequest {
    query: String,
}

async fn handle_estimate(
    State(state): State<AppState>,
    Json(req): Json<EstimateRequest>,
) -> Result<Json<WorkflowState>, AppError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    Ok(Json(state.pipeline.run(query).await))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /status ============

#[derive(Serialize)]
struct StatusResponse {
    search_configured: bool,
    llm_configured: bool,
    embedding_model: String,
}

async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        search_configured: state.pipeline.has_search(),
        llm_configured: state.pipeline.has_llm(),
        embedding_model: state.pipeline.embedding_model().to_string(),
    })
}
