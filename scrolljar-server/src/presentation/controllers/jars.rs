//! Jar API controllers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::instrument;

use crate::presentation::controllers::AppState;
use crate::presentation::extractors::{
    ApiJson, AuthenticatedPrincipal, CurrentPrincipal, PastePassword,
};
use crate::presentation::middleware::ApiError;
use crate::presentation::models::{
    CreateJarRequest, CreateJarResponse, ErrorResponse, IssuedScrollResponse, JarListResponse,
    JarResponse, ScrollDraftRequest, ScrollListResponse,
};

/// POST /v1/jar - Create a jar with its initial scrolls
#[utoipa::path(
    post,
    path = "/v1/jar",
    request_body = CreateJarRequest,
    responses(
        (status = 201, description = "Jar created; each scroll carries its upload token", body = CreateJarResponse),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse)
    ),
    tag = "jars",
    security((), ("bearer_token" = []))
)]
#[instrument(skip(state, principal, request))]
pub async fn create_jar(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ApiJson(request): ApiJson<CreateJarRequest>,
) -> Result<(StatusCode, Json<CreateJarResponse>), ApiError> {
    let result = state
        .create_jar_use_case
        .execute(&principal, request.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateJarResponse::new(result, &state.base_url)),
    ))
}

/// GET /v1/jar/{id} - Read a jar
#[utoipa::path(
    get,
    path = "/v1/jar/{id}",
    params(
        ("id" = String, Path, description = "Jar id"),
        ("X-Paste-Password" = Option<String>, Header, description = "Password of a private jar")
    ),
    responses(
        (status = 200, description = "Jar found", body = JarResponse),
        (status = 401, description = "Wrong or missing jar password", body = ErrorResponse),
        (status = 404, description = "Jar not found", body = ErrorResponse)
    ),
    tag = "jars"
)]
pub async fn get_jar(
    State(state): State<AppState>,
    Path(id): Path<String>,
    PastePassword(password): PastePassword,
) -> Result<Json<JarResponse>, ApiError> {
    let jar = state.get_jar_use_case.execute(&id, password).await?;
    Ok(Json(JarResponse::new(jar, &state.base_url)))
}

/// DELETE /v1/jar/{id} - Delete a jar and its scrolls
#[utoipa::path(
    delete,
    path = "/v1/jar/{id}",
    params(("id" = String, Path, description = "Jar id")),
    responses(
        (status = 204, description = "Jar deleted"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not the jar owner", body = ErrorResponse),
        (status = 404, description = "Jar not found", body = ErrorResponse)
    ),
    tag = "jars",
    security(("bearer_token" = []))
)]
pub async fn delete_jar(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.delete_jar_use_case.execute(&principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/jar/{id}/scrolls - List the scrolls of a jar
#[utoipa::path(
    get,
    path = "/v1/jar/{id}/scrolls",
    params(
        ("id" = String, Path, description = "Jar id"),
        ("X-Paste-Password" = Option<String>, Header, description = "Password of a private jar")
    ),
    responses(
        (status = 200, description = "Scrolls in the jar", body = ScrollListResponse),
        (status = 401, description = "Wrong or missing jar password", body = ErrorResponse),
        (status = 404, description = "Jar not found", body = ErrorResponse)
    ),
    tag = "jars"
)]
pub async fn list_jar_scrolls(
    State(state): State<AppState>,
    Path(id): Path<String>,
    PastePassword(password): PastePassword,
) -> Result<Json<ScrollListResponse>, ApiError> {
    let scrolls = state
        .list_jar_scrolls_use_case
        .execute(&id, password)
        .await?;
    Ok(Json(ScrollListResponse::new(scrolls, &state.base_url)))
}

/// POST /v1/jar/{id}/scrolls - Add a scroll to an owned jar
#[utoipa::path(
    post,
    path = "/v1/jar/{id}/scrolls",
    params(("id" = String, Path, description = "Jar id")),
    request_body = ScrollDraftRequest,
    responses(
        (status = 201, description = "Scroll created with its upload token", body = IssuedScrollResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not the jar owner", body = ErrorResponse),
        (status = 404, description = "Jar not found", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "jars",
    security(("bearer_token" = []))
)]
#[instrument(skip(state, principal, request))]
pub async fn create_scroll(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ScrollDraftRequest>,
) -> Result<(StatusCode, Json<IssuedScrollResponse>), ApiError> {
    let issued = state
        .create_scroll_use_case
        .execute(&principal, &id, request.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IssuedScrollResponse::new(issued, &state.base_url)),
    ))
}

/// GET /v1/user/jars - Jars owned by the caller
#[utoipa::path(
    get,
    path = "/v1/user/jars",
    responses(
        (status = 200, description = "Owned jars", body = JarListResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    tag = "jars",
    security(("bearer_token" = []))
)]
pub async fn list_user_jars(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Json<JarListResponse>, ApiError> {
    let jars = state.list_user_jars_use_case.execute(&principal).await?;
    Ok(Json(JarListResponse::new(jars, &state.base_url)))
}
