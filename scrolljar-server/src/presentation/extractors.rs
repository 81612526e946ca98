//! Request extractors for principals, headers and JSON bodies

use axum::{
    extract::{FromRequest, FromRequestParts, Request, rejection::JsonRejection},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use scrolljar_core::application::ApplicationError;
use scrolljar_core::domain::auth::Principal;

use crate::presentation::middleware::ApiError;

pub const UPLOAD_TOKEN_HEADER: &str = "x-upload-token";
pub const PASTE_PASSWORD_HEADER: &str = "x-paste-password";

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// The caller as resolved by the authentication middleware; anonymous when absent
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<Principal>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

/// Like [`CurrentPrincipal`] but rejects anonymous callers with 401
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentPrincipal(principal) = CurrentPrincipal::from_request_parts(parts, state).await?;
        if principal.is_anonymous() {
            return Err(ApiError(ApplicationError::AuthenticationRequired));
        }
        Ok(Self(principal))
    }
}

/// Optional `X-Paste-Password` header
#[derive(Debug, Clone, Default)]
pub struct PastePassword(pub Option<String>);

impl<S> FromRequestParts<S> for PastePassword
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(header_value(parts, PASTE_PASSWORD_HEADER)))
    }
}

/// Optional `X-Upload-Token` header; a missing token is judged by the use case
#[derive(Debug, Clone, Default)]
pub struct UploadToken(pub Option<String>);

impl<S> FromRequestParts<S> for UploadToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(header_value(parts, UPLOAD_TOKEN_HEADER)))
    }
}

/// JSON body whose rejections use the structured error body
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        axum::Json::<T>::from_request(request, state)
            .await
            .map(|axum::Json(value)| Self(value))
            .map_err(|rejection: JsonRejection| {
                ApiError(ApplicationError::BadRequest(rejection.body_text()))
            })
    }
}
