//! Global and per-client admission middleware

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use scrolljar_core::application::errors::ApplicationError;
use scrolljar_core::infrastructure::rate_limiter::{RateLimitResult, RateLimiterService};

use super::{TrustedProxies, application_error_to_response, client_ip, route_tier};

/// Shared state for rate limiting middleware
#[derive(Clone)]
pub struct RateLimiterState {
    pub service: Arc<RateLimiterService>,
    pub trusted_proxies: TrustedProxies,
}

impl RateLimiterState {
    pub fn new(service: Arc<RateLimiterService>, trusted_proxies: TrustedProxies) -> Self {
        Self {
            service,
            trusted_proxies,
        }
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("enabled", &self.service.is_enabled())
            .finish()
    }
}

/// Add IETF draft rate limit headers to response
fn add_rate_limit_headers(response: &mut Response, limit: u32, remaining: u32) {
    let headers = response.headers_mut();
    headers.insert("ratelimit-limit", HeaderValue::from(limit));
    headers.insert("ratelimit-remaining", HeaderValue::from(remaining));
}

fn rejection(result: &RateLimitResult) -> Response {
    let mut response = application_error_to_response(ApplicationError::RateLimited {
        scope: result.scope.to_string(),
        retry_after: result.retry_after.unwrap_or(1),
    });
    add_rate_limit_headers(&mut response, result.limit, 0);
    response
}

/// Shared bucket consulted before anything else
pub async fn global_rate_limit_middleware(
    State(state): State<RateLimiterState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.service.is_enabled() {
        return next.run(request).await;
    }

    let result = state.service.check_global();
    if !result.allowed {
        tracing::warn!(
            ip = %client_ip(&request, &state.trusted_proxies),
            retry_after = ?result.retry_after,
            "Global rate limit exceeded"
        );
        return rejection(&result);
    }

    next.run(request).await
}

/// Per-address bucket of the route's tier
pub async fn client_rate_limit_middleware(
    State(state): State<RateLimiterState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.service.is_enabled() {
        return next.run(request).await;
    }

    let ip = client_ip(&request, &state.trusted_proxies);
    let tier = route_tier(request.method(), request.uri().path());
    let result = state.service.check_client(&ip, tier);

    if !result.allowed {
        tracing::warn!(
            ip = %ip,
            tier = %tier,
            retry_after = ?result.retry_after,
            "Client rate limit exceeded"
        );
        return rejection(&result);
    }

    let mut response = next.run(request).await;
    add_rate_limit_headers(&mut response, result.limit, result.remaining);
    response
}
