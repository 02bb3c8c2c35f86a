//! HTTP API handlers.
//!
//! Every operation error is returned to the caller as a structured JSON body
//! `{ "kind": ..., "message": ... }` with a mapped status code; none of them
//! crashes the supervisor.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use geowarden_common::SupervisorError;
use geowarden_output::OutputLine;
use geowarden_supervisor::{HealthStatus, Supervisor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Creates the control API router.
pub fn create_router(supervisor: Arc<Supervisor>) -> Router {
    Router::new()
        .route("/api/v1/process/start", post(start_handler))
        .route("/api/v1/process/stop", post(stop_handler))
        .route("/api/v1/process/restart", post(restart_handler))
        .route("/api/v1/process/status", get(status_handler))
        .route("/api/v1/process/output", get(output_handler))
        .route("/api/v1/health", get(health_handler))
        .with_state(supervisor)
}

async fn start_handler(
    State(supervisor): State<Arc<Supervisor>>,
) -> Result<Json<HealthStatus>, ApiError> {
    let status = supervisor.start().await?;
    Ok(Json(status))
}

async fn stop_handler(
    State(supervisor): State<Arc<Supervisor>>,
) -> Result<Json<HealthStatus>, ApiError> {
    let status = supervisor.stop().await?;
    Ok(Json(status))
}

async fn restart_handler(
    State(supervisor): State<Arc<Supervisor>>,
) -> Result<Json<HealthStatus>, ApiError> {
    let status = supervisor.restart().await?;
    Ok(Json(status))
}

async fn status_handler(State(supervisor): State<Arc<Supervisor>>) -> Json<HealthStatus> {
    Json(supervisor.status().await)
}

#[derive(Debug, Deserialize)]
struct OutputQuery {
    /// Number of most recent lines to return; everything retained when absent
    lines: Option<usize>,
}

#[derive(Debug, Serialize)]
struct OutputResponse {
    lines: Vec<OutputLine>,
    /// Lines evicted from the ring buffer since the current instance started
    dropped: u64,
}

async fn output_handler(
    State(supervisor): State<Arc<Supervisor>>,
    Query(query): Query<OutputQuery>,
) -> Json<OutputResponse> {
    let n = query.lines.unwrap_or(supervisor.output_capacity());
    Json(OutputResponse {
        lines: supervisor.recent_output(n),
        dropped: supervisor.output_dropped(),
    })
}

/// The supervisor's own liveness endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

/// Wire format for operation errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub message: String,
}

/// Adapter from operation errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError(SupervisorError);

impl From<SupervisorError> for ApiError {
    fn from(err: SupervisorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SupervisorError::AlreadyRunning | SupervisorError::NotRunning => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error!(kind = self.0.kind(), error = %self.0, "operation failed");

        let body = Json(ErrorResponse {
            kind: self.0.kind().to_string(),
            message: self.0.to_string(),
        });
        (status, body).into_response()
    }
}
