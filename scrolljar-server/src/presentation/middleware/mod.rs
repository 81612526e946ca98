//! HTTP middleware for the web server

pub mod auth;
pub mod rate_limit;
pub mod route_tiers;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use std::any::Any;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use scrolljar_core::application::errors::ApplicationError;

use crate::presentation::models::ErrorResponse;
use crate::presentation::request_context::{
    RequestContext, current_request_context, with_request_context,
};

pub use auth::{AuthenticationState, authenticate_middleware};
pub use rate_limit::{RateLimiterState, client_rate_limit_middleware, global_rate_limit_middleware};
pub use route_tiers::route_tier;

/// Convert ApplicationError to HTTP response
pub fn application_error_to_response(error: ApplicationError) -> Response {
    let context = current_request_context();

    let (status, code, message) = match &error {
        ApplicationError::RateLimited { .. } => (
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "Rate limit exceeded. Please retry later.",
        ),
        ApplicationError::EditConflict => (
            StatusCode::CONFLICT,
            "EDIT_CONFLICT",
            "The resource was modified concurrently. Re-fetch and retry.",
        ),
        ApplicationError::AlreadyDelivered => (
            StatusCode::CONFLICT,
            "ALREADY_DELIVERED",
            "Scroll content has already been uploaded",
        ),
        // Same body as a missing record
        ApplicationError::InvalidCapability | ApplicationError::NotFound { .. } => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found")
        }
        ApplicationError::Validation { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "VALIDATION_ERROR",
            "Input failed validation",
        ),
        ApplicationError::BadRequest(_) => (
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST",
            "The request could not be understood",
        ),
        ApplicationError::InvalidContent(_) => (
            StatusCode::BAD_REQUEST,
            "INVALID_CONTENT",
            "Content must be valid UTF-8 text",
        ),
        ApplicationError::PayloadTooLarge { .. } => (
            StatusCode::PAYLOAD_TOO_LARGE,
            "PAYLOAD_TOO_LARGE",
            "Content exceeds the upload size limit",
        ),
        ApplicationError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            "Invalid authentication credentials",
        ),
        ApplicationError::InvalidAuthenticationToken => (
            StatusCode::UNAUTHORIZED,
            "INVALID_AUTHENTICATION_TOKEN",
            "Invalid or missing authentication token",
        ),
        ApplicationError::AuthenticationRequired => (
            StatusCode::UNAUTHORIZED,
            "AUTHENTICATION_REQUIRED",
            "You must be authenticated to access this resource",
        ),
        ApplicationError::InactiveAccount => (
            StatusCode::FORBIDDEN,
            "INACTIVE_ACCOUNT",
            "Your account must be activated to access this resource",
        ),
        ApplicationError::AlreadyActivated => (
            StatusCode::CONFLICT,
            "ALREADY_ACTIVATED",
            "Account already activated",
        ),
        ApplicationError::Forbidden => (
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "You are not permitted to modify this resource",
        ),
        ApplicationError::TransactionFailure(_)
        | ApplicationError::Storage(_)
        | ApplicationError::Internal(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            if context.expose_details {
                "Internal server error"
            } else {
                "An internal error occurred"
            },
        ),
    };

    // 4xx = client errors (warn level), 5xx = server errors (error level)
    if status.is_server_error() {
        tracing::error!(
            request_id = %context.request_id,
            error = %error,
            http_status = %status,
            error_code = code,
            "Server error mapped to HTTP response"
        );
    } else {
        tracing::warn!(
            request_id = %context.request_id,
            error = %error,
            http_status = %status,
            error_code = code,
            "Client error mapped to HTTP response"
        );
    }

    let details = match &error {
        ApplicationError::Validation { errors } => Some(serde_json::json!({ "fields": errors })),
        ApplicationError::InvalidCapability | ApplicationError::NotFound { .. } => None,
        ApplicationError::PayloadTooLarge { limit } => Some(serde_json::json!({ "limit": limit })),
        ApplicationError::RateLimited { scope, retry_after } => Some(serde_json::json!({
            "scope": scope,
            "retry_after": retry_after,
        })),
        _ if context.expose_details => Some(serde_json::json!({ "error": error.to_string() })),
        _ => None,
    };

    let error_response = ErrorResponse {
        code: code.to_string(),
        message: message.to_string(),
        details,
        request_id: context.request_id,
        timestamp: Utc::now(),
    };

    let mut response = (status, Json(error_response)).into_response();

    if let ApplicationError::RateLimited { retry_after, .. } = error
        && let Ok(value) = HeaderValue::from_str(&retry_after.to_string())
    {
        response.headers_mut().insert("retry-after", value);
    }

    response
}

/// Handler error wrapper so use-case errors can be returned with `?`
#[derive(Debug)]
pub struct ApiError(pub ApplicationError);

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        application_error_to_response(self.0)
    }
}

/// Policy applied when rendering errors
#[derive(Debug, Clone, Copy)]
pub struct ErrorPolicy {
    pub expose_details: bool,
}

/// Assign a request id and scope the request context for everything below
pub async fn request_context_middleware(
    State(policy): State<ErrorPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let context = RequestContext::new(policy.expose_details);
    let mut response = with_request_context(context, next.run(request)).await;

    if let Ok(value) = HeaderValue::from_str(&context.request_id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Request logging middleware with timing
pub async fn logging_middleware(
    State(trusted): State<TrustedProxies>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let ip = client_ip(&request, &trusted);
    let request_id = current_request_context().request_id;
    let start_time = Instant::now();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        ip = %ip,
        "Processing request"
    );

    let response = next.run(request).await;
    let duration = start_time.elapsed();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        ip = %ip,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

/// Response for a handler that panicked. Used with `CatchPanicLayer::custom`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    application_error_to_response(ApplicationError::Internal(format!(
        "request handler panicked: {detail}"
    )))
}

/// Peers allowed to name the client through forwarding headers
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(Arc<[IpAddr]>);

impl TrustedProxies {
    pub fn new(proxies: &[IpAddr]) -> Self {
        Self(proxies.into())
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }

    /// Nearest `X-Forwarded-For` hop that is not itself a trusted proxy,
    /// else `X-Real-IP`
    fn forwarded_client(&self, request: &Request) -> Option<IpAddr> {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|chain| {
                let mut client = None;
                for hop in chain.rsplit(',').map(|hop| hop.trim().parse::<IpAddr>()) {
                    let Ok(hop) = hop else { break };
                    client = Some(hop);
                    if !self.contains(&hop) {
                        break;
                    }
                }
                client
            });

        forwarded.or_else(|| {
            request
                .headers()
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
        })
    }
}

/// Client address used for rate limiting and logs.
///
/// The socket peer is the client unless it is a trusted proxy, in which case
/// the forwarding headers it set are believed.
pub fn client_ip(request: &Request, trusted: &TrustedProxies) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    match peer {
        Some(peer) if trusted.contains(&peer) => trusted
            .forwarded_client(request)
            .unwrap_or(peer)
            .to_string(),
        Some(peer) => peer.to_string(),
        None => "unknown-ip".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(headers: &[(&str, &str)]) -> Request {
        let mut builder = Request::builder().uri("/v1/ping");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn from_peer(mut request: Request, peer: [u8; 4]) -> Request {
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 4000))));
        request
    }

    fn proxies(addresses: &[&str]) -> TrustedProxies {
        let addresses: Vec<IpAddr> = addresses.iter().map(|a| a.parse().unwrap()).collect();
        TrustedProxies::new(&addresses)
    }

    #[test]
    fn test_untrusted_peer_headers_are_ignored() {
        let request = from_peer(
            request_with(&[
                ("x-forwarded-for", "203.0.113.7"),
                ("x-real-ip", "198.51.100.2"),
            ]),
            [192, 0, 2, 9],
        );
        assert_eq!(client_ip(&request, &TrustedProxies::default()), "192.0.2.9");
        assert_eq!(client_ip(&request, &proxies(&["10.0.0.1"])), "192.0.2.9");
    }

    #[test]
    fn test_trusted_proxy_names_nearest_untrusted_hop() {
        let trusted = proxies(&["10.0.0.1", "10.0.0.2"]);

        // The leftmost entry is client-controlled; only the hop appended by a trusted proxy counts
        let request = from_peer(
            request_with(&[("x-forwarded-for", "1.1.1.1, 203.0.113.7, 10.0.0.2")]),
            [10, 0, 0, 1],
        );
        assert_eq!(client_ip(&request, &trusted), "203.0.113.7");

        let request = from_peer(request_with(&[("x-real-ip", "198.51.100.2")]), [10, 0, 0, 1]);
        assert_eq!(client_ip(&request, &trusted), "198.51.100.2");

        let request = from_peer(
            request_with(&[("x-forwarded-for", "not-an-address")]),
            [10, 0, 0, 1],
        );
        assert_eq!(client_ip(&request, &trusted), "10.0.0.1");
    }

    #[test]
    fn test_missing_peer_is_unknown() {
        let request = request_with(&[("x-forwarded-for", "203.0.113.7")]);
        assert_eq!(client_ip(&request, &proxies(&["203.0.113.7"])), "unknown-ip");
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApplicationError::RateLimited {
                    scope: "global".to_string(),
                    retry_after: 1,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (ApplicationError::EditConflict, StatusCode::CONFLICT),
            (ApplicationError::AlreadyDelivered, StatusCode::CONFLICT),
            (ApplicationError::InvalidCapability, StatusCode::NOT_FOUND),
            (ApplicationError::not_found("jar"), StatusCode::NOT_FOUND),
            (
                ApplicationError::validation("name", "too long"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApplicationError::PayloadTooLarge { limit: 1 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (ApplicationError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ApplicationError::InactiveAccount, StatusCode::FORBIDDEN),
            (ApplicationError::Forbidden, StatusCode::FORBIDDEN),
            (
                ApplicationError::internal("boom"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(application_error_to_response(error).status(), status);
        }
    }

    #[test]
    fn test_rate_limited_carries_retry_after() {
        let response = application_error_to_response(ApplicationError::RateLimited {
            scope: "client:strict".to_string(),
            retry_after: 7,
        });
        assert_eq!(response.headers().get("retry-after").unwrap(), "7");
    }

    #[test]
    fn test_panic_response_is_structured_500() {
        let response = panic_response(Box::new("kaboom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
