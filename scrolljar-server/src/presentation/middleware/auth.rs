//! Principal resolution from the `Authorization` header

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use scrolljar_core::application::{ApplicationError, ResolvePrincipalUseCase};

use super::application_error_to_response;

#[derive(Clone)]
pub struct AuthenticationState {
    pub resolve_principal: Arc<ResolvePrincipalUseCase>,
}

/// `Ok(None)` when no header is present, `Err` when it is not a bearer token
fn bearer_token(request: &Request) -> Result<Option<&str>, ApplicationError> {
    let Some(value) = request.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| ApplicationError::InvalidAuthenticationToken)?;

    match value.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() && !token.contains(' ') => Ok(Some(token)),
        _ => Err(ApplicationError::InvalidAuthenticationToken),
    }
}

/// Resolve the caller into a `Principal` stored in request extensions.
/// A present but unusable token is rejected here, before any handler runs.
pub async fn authenticate_middleware(
    State(state): State<AuthenticationState>,
    mut request: Request,
    next: Next,
) -> Response {
    let principal = match bearer_token(&request) {
        Ok(token) => state.resolve_principal.execute(token).await,
        Err(e) => Err(e),
    };

    let mut response = match principal {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => application_error_to_response(e),
    };

    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}
