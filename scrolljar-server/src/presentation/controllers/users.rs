//! Account API controllers

use axum::{extract::State, http::StatusCode, response::Json};
use tracing::instrument;

use scrolljar_core::application::ApplicationError;

use crate::presentation::controllers::AppState;
use crate::presentation::extractors::{ApiJson, AuthenticatedPrincipal};
use crate::presentation::middleware::ApiError;
use crate::presentation::models::{
    ActivateRequest, AuthTokensResponse, CredentialsRequest, ErrorResponse, RegisterRequest,
    UserResponse,
};

/// POST /v1/user/register - Create an account
///
/// The activation token is delivered by mail.
#[utoipa::path(
    post,
    path = "/v1/user/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created; activation mail queued", body = UserResponse),
        (status = 422, description = "Validation failed or email taken", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse)
    ),
    tag = "users"
)]
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state.register_user_use_case.execute(request.into()).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// PUT /v1/user/activate - Activate an account with its activation token
#[utoipa::path(
    put,
    path = "/v1/user/activate",
    request_body = ActivateRequest,
    responses(
        (status = 200, description = "Account activated", body = UserResponse),
        (status = 409, description = "Concurrent edit; retry", body = ErrorResponse),
        (status = 422, description = "Invalid or expired token", body = ErrorResponse)
    ),
    tag = "users"
)]
#[instrument(skip(state, request))]
pub async fn activate(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ActivateRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.activate_user_use_case.execute(request.token).await?;
    Ok(Json(user.into()))
}

/// POST /v1/user/auth - Exchange credentials for bearer tokens
#[utoipa::path(
    post,
    path = "/v1/user/auth",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Authorization and refresh tokens", body = AuthTokensResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account not activated", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "users"
)]
#[instrument(skip(state, request))]
pub async fn authenticate(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CredentialsRequest>,
) -> Result<(StatusCode, Json<AuthTokensResponse>), ApiError> {
    let tokens = state
        .authenticate_user_use_case
        .execute(request.email, request.password)
        .await?;
    Ok((StatusCode::CREATED, Json(tokens.into())))
}

/// GET /v1/user - The authenticated account
#[utoipa::path(
    get,
    path = "/v1/user",
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    tag = "users",
    security(("bearer_token" = []))
)]
pub async fn current_user(
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Json<UserResponse>, ApiError> {
    let user = principal
        .user()
        .cloned()
        .ok_or(ApplicationError::AuthenticationRequired)?;
    Ok(Json(user.into()))
}
