//! Token API controllers

use axum::{extract::State, http::StatusCode, response::Json};
use tracing::instrument;

use crate::presentation::controllers::AppState;
use crate::presentation::extractors::ApiJson;
use crate::presentation::middleware::ApiError;
use crate::presentation::models::{ActivationTokenResponse, CredentialsRequest, ErrorResponse};

/// POST /v1/token/activation - Mail a fresh activation token
#[utoipa::path(
    post,
    path = "/v1/token/activation",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Activation token mailed", body = ActivationTokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 409, description = "Account already activated", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse)
    ),
    tag = "tokens"
)]
#[instrument(skip(state, request))]
pub async fn create_activation_token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CredentialsRequest>,
) -> Result<(StatusCode, Json<ActivationTokenResponse>), ApiError> {
    let expiry = state
        .create_activation_token_use_case
        .execute(request.email, request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ActivationTokenResponse {
            message: "an email will be sent to you containing activation instructions".to_string(),
            expiry,
        }),
    ))
}
