//! Scroll API controllers

use axum::{
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use futures::{StreamExt, TryStreamExt};
use tracing::instrument;

use scrolljar_core::application::UploadScrollCommand;
use scrolljar_core::domain::storage::StorageError;

use crate::presentation::controllers::AppState;
use crate::presentation::extractors::{
    ApiJson, AuthenticatedPrincipal, PastePassword, UploadToken,
};
use crate::presentation::middleware::ApiError;
use crate::presentation::models::{
    ErrorResponse, ScrollContentResponse, ScrollResponse, UpdateScrollRequest, UploadResponse,
};

/// GET /v1/scroll/{id} - Read a delivered scroll
#[utoipa::path(
    get,
    path = "/v1/scroll/{id}",
    params(
        ("id" = String, Path, description = "Scroll id"),
        ("X-Paste-Password" = Option<String>, Header, description = "Password of the private jar holding the scroll")
    ),
    responses(
        (status = 200, description = "Scroll metadata and a download URL", body = ScrollContentResponse),
        (status = 401, description = "Wrong or missing jar password", body = ErrorResponse),
        (status = 404, description = "Scroll not found or not yet uploaded", body = ErrorResponse)
    ),
    tag = "scrolls"
)]
pub async fn get_scroll(
    State(state): State<AppState>,
    Path(id): Path<String>,
    PastePassword(password): PastePassword,
) -> Result<Json<ScrollContentResponse>, ApiError> {
    let view = state.get_scroll_use_case.execute(&id, password).await?;
    Ok(Json(ScrollContentResponse::new(view, &state.base_url)))
}

/// POST /v1/scroll/{id} - Upload scroll content
///
/// The body is streamed to object storage while it is checked for UTF-8 and
/// the size ceiling bound into the upload token.
#[utoipa::path(
    post,
    path = "/v1/scroll/{id}",
    params(
        ("id" = String, Path, description = "Scroll id"),
        ("X-Upload-Token" = String, Header, description = "Upload token returned when the scroll was created")
    ),
    request_body(content = String, content_type = "text/plain"),
    responses(
        (status = 200, description = "Content stored", body = UploadResponse),
        (status = 400, description = "Content is not UTF-8", body = ErrorResponse),
        (status = 404, description = "Unknown scroll or unusable token", body = ErrorResponse),
        (status = 409, description = "Content already uploaded", body = ErrorResponse),
        (status = 413, description = "Content exceeds the size limit", body = ErrorResponse)
    ),
    tag = "scrolls"
)]
#[instrument(skip(state, token, body))]
pub async fn upload_scroll(
    State(state): State<AppState>,
    Path(id): Path<String>,
    UploadToken(token): UploadToken,
    body: Body,
) -> Result<Json<UploadResponse>, ApiError> {
    let body = body
        .into_data_stream()
        .map_err(|e| StorageError::Body(e.to_string()))
        .boxed();

    let result = state
        .upload_scroll_use_case
        .execute(UploadScrollCommand {
            scroll_id: id,
            token,
            body,
        })
        .await?;

    Ok(Json(UploadResponse::new(result, &state.base_url)))
}

/// PATCH /v1/scroll/{id} - Edit scroll metadata
#[utoipa::path(
    patch,
    path = "/v1/scroll/{id}",
    params(("id" = String, Path, description = "Scroll id")),
    request_body = UpdateScrollRequest,
    responses(
        (status = 200, description = "Scroll updated; carries the new version", body = ScrollResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not the jar owner", body = ErrorResponse),
        (status = 404, description = "Scroll not found", body = ErrorResponse),
        (status = 409, description = "Version is stale; re-fetch and retry", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "scrolls",
    security(("bearer_token" = []))
)]
#[instrument(skip(state, principal, request))]
pub async fn update_scroll(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateScrollRequest>,
) -> Result<Json<ScrollResponse>, ApiError> {
    let scroll = state
        .update_scroll_use_case
        .execute(&principal, &id, request.into())
        .await?;
    Ok(Json(ScrollResponse::new(scroll, &state.base_url)))
}

/// DELETE /v1/scroll/{id} - Delete a scroll
#[utoipa::path(
    delete,
    path = "/v1/scroll/{id}",
    params(("id" = String, Path, description = "Scroll id")),
    responses(
        (status = 204, description = "Scroll deleted"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not the jar owner", body = ErrorResponse),
        (status = 404, description = "Scroll not found", body = ErrorResponse)
    ),
    tag = "scrolls",
    security(("bearer_token" = []))
)]
pub async fn delete_scroll(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.delete_scroll_use_case.execute(&principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
