//! Static route to rate-limit tier table

use axum::http::Method;
use scrolljar_core::infrastructure::rate_limiter::RouteTier;

/// Tier of the route serving `method` + `path`.
///
/// Identity-sensitive routes are Strict, writes Medium, reads General. Paths
/// not in the table fall into General.
pub fn route_tier(method: &Method, path: &str) -> RouteTier {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (method.as_str(), segments.as_slice()) {
        ("POST", ["v1", "user", "register"])
        | ("PUT", ["v1", "user", "activate"])
        | ("POST", ["v1", "token", "activation"]) => RouteTier::Strict,

        ("POST", ["v1", "jar"])
        | ("DELETE", ["v1", "jar", _])
        | ("POST", ["v1", "jar", _, "scrolls"])
        | ("POST" | "PATCH" | "DELETE", ["v1", "scroll", _])
        | ("GET", ["v1", "user"])
        | ("POST", ["v1", "user", "auth"]) => RouteTier::Medium,

        _ => RouteTier::General,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_routes_are_strict() {
        assert_eq!(route_tier(&Method::POST, "/v1/user/register"), RouteTier::Strict);
        assert_eq!(route_tier(&Method::PUT, "/v1/user/activate"), RouteTier::Strict);
        assert_eq!(route_tier(&Method::POST, "/v1/token/activation"), RouteTier::Strict);
    }

    #[test]
    fn test_writes_are_medium() {
        assert_eq!(route_tier(&Method::POST, "/v1/jar"), RouteTier::Medium);
        assert_eq!(route_tier(&Method::DELETE, "/v1/jar/AbCdEf12"), RouteTier::Medium);
        assert_eq!(route_tier(&Method::POST, "/v1/jar/AbCdEf12/scrolls"), RouteTier::Medium);
        assert_eq!(route_tier(&Method::PATCH, "/v1/scroll/AbCdEf12"), RouteTier::Medium);
        assert_eq!(route_tier(&Method::POST, "/v1/user/auth"), RouteTier::Medium);
    }

    #[test]
    fn test_reads_and_unknown_routes_are_general() {
        assert_eq!(route_tier(&Method::GET, "/v1/jar/AbCdEf12"), RouteTier::General);
        assert_eq!(route_tier(&Method::GET, "/v1/scroll/AbCdEf12"), RouteTier::General);
        assert_eq!(route_tier(&Method::GET, "/v1/user/jars"), RouteTier::General);
        assert_eq!(route_tier(&Method::GET, "/v1/ping"), RouteTier::General);
        assert_eq!(route_tier(&Method::POST, "/v2/nowhere"), RouteTier::General);
    }
}
