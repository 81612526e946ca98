//! Liveness endpoint

use axum::{extract::State, response::Json};

use crate::presentation::controllers::AppState;
use crate::presentation::models::PingResponse;

/// GET /v1/ping - Liveness and build information
#[utoipa::path(
    get,
    path = "/v1/ping",
    responses(
        (status = 200, description = "Service is running", body = PingResponse)
    ),
    tag = "health"
)]
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    Json(PingResponse {
        status: "running".to_string(),
        uptime_seconds: state.runtime.started_at.elapsed().as_secs(),
        environment: state.runtime.environment.clone(),
        version: state.runtime.version.clone(),
    })
}
