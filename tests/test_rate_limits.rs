//! Admission control over HTTP

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::*;
use scrolljar_core::Config;

fn limited_config(global_rate: f64, global_burst: u32) -> Config {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.global_rate = global_rate;
    config.rate_limit.global_burst = global_burst;
    config.rate_limit.client_rate = 10.0;
    config.rate_limit.client_burst = 15;
    config.rate_limit.medium_divisor = 5;
    config.rate_limit.strict_divisor = 10;
    config
}

fn ping_from(ip: &str) -> axum::http::Request<axum::body::Body> {
    RequestBuilder::new(Method::GET, "/v1/ping").peer(ip).empty()
}

fn register_as(email: &str) -> serde_json::Value {
    json!({
        "username": "limited",
        "email": email,
        "password": "correct horse battery",
    })
}

// ============================================================================
// Global bucket
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_global_bucket_rejects_after_burst() {
    let app = TestApp::with_config(limited_config(5.0, 5));

    // Distinct addresses so only the shared bucket can reject
    for i in 0..5 {
        let response = app.send(ping_from(&format!("198.51.100.{i}"))).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let rejected = app.send(ping_from("198.51.100.99")).await;
    assert_eq!(rejected.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(rejected.body["code"], "RATE_LIMITED");
    assert_eq!(rejected.body["details"]["scope"], "global");
    assert!(rejected.headers.contains_key("retry-after"));
    assert!(rejected.headers.contains_key("x-request-id"));

    // One refill interval at 5/s admits exactly one more
    tokio::time::advance(std::time::Duration::from_millis(200)).await;
    assert_eq!(app.send(ping_from("198.51.100.100")).await.status, StatusCode::OK);
    assert_eq!(
        app.send(ping_from("198.51.100.101")).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );
}

// ============================================================================
// Per-client tiers
// ============================================================================

#[tokio::test]
async fn test_strict_route_admits_two_then_rejects() {
    let app = TestApp::with_config(limited_config(1000.0, 1000));

    let mut statuses = Vec::new();
    for i in 0..3 {
        let response = app
            .send(
                RequestBuilder::new(Method::POST, "/v1/user/register")
                    .peer("203.0.113.7")
                    .json(register_as(&format!("limited{i}@example.com"))),
            )
            .await;
        statuses.push(response);
    }

    assert_ne!(statuses[0].status, StatusCode::TOO_MANY_REQUESTS);
    assert_ne!(statuses[1].status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(statuses[2].status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(statuses[2].body["details"]["scope"], "client:strict");
    assert_eq!(statuses[2].headers.get("ratelimit-limit").unwrap(), "2");
    assert_eq!(statuses[2].headers.get("ratelimit-remaining").unwrap(), "0");

    // Another address has its own bucket
    let other = app
        .send(
            RequestBuilder::new(Method::POST, "/v1/user/register")
                .peer("203.0.113.8")
                .json(register_as("other@example.com")),
        )
        .await;
    assert_eq!(other.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_tiers_of_one_client_are_independent() {
    let app = TestApp::with_config(limited_config(1000.0, 1000));
    let ip = "192.0.2.44";

    for _ in 0..3 {
        app.send(
            RequestBuilder::new(Method::POST, "/v1/token/activation")
                .peer(ip)
                .json(json!({ "email": "nobody@example.com" })),
        )
        .await;
    }

    // Strict bucket is drained; General reads still pass
    let ping = app.send(ping_from(ip)).await;
    assert_eq!(ping.status, StatusCode::OK);
    assert_eq!(ping.headers.get("ratelimit-limit").unwrap(), "15");
    assert_eq!(ping.headers.get("ratelimit-remaining").unwrap(), "14");
}

#[tokio::test]
async fn test_forwarded_headers_from_untrusted_peer_share_its_bucket() {
    let app = TestApp::with_config(limited_config(1000.0, 1000));

    // A new forwarded address on every attempt still lands in the peer's bucket
    let mut statuses = Vec::new();
    for i in 0..3 {
        let response = app
            .send(
                RequestBuilder::new(Method::POST, "/v1/user/register")
                    .peer("203.0.113.7")
                    .header("x-forwarded-for", &format!("198.51.100.{i}"))
                    .header("x-real-ip", &format!("198.51.100.{}", i + 100))
                    .json(register_as(&format!("rotating{i}@example.com"))),
            )
            .await;
        statuses.push(response.status);
    }

    assert_ne!(statuses[0], StatusCode::TOO_MANY_REQUESTS);
    assert_ne!(statuses[1], StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(statuses[2], StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_trusted_proxy_forwards_client_address() {
    let mut config = limited_config(1000.0, 1000);
    config.server.trusted_proxies = vec!["10.0.0.1".parse().unwrap()];
    let app = TestApp::with_config(config);

    let register = |forwarded: &str, email: &str| {
        RequestBuilder::new(Method::POST, "/v1/user/register")
            .peer("10.0.0.1")
            .header("x-forwarded-for", forwarded)
            .json(register_as(email))
    };

    for i in 0..2 {
        let response = app
            .send(register("203.0.113.7", &format!("proxied{i}@example.com")))
            .await;
        assert_ne!(response.status, StatusCode::TOO_MANY_REQUESTS);
    }

    // A client-supplied leftmost entry does not escape the hop the proxy appended
    let spoofed = app
        .send(register("1.2.3.4, 203.0.113.7", "spoofed@example.com"))
        .await;
    assert_eq!(spoofed.status, StatusCode::TOO_MANY_REQUESTS);

    let other = app
        .send(register("203.0.113.8", "neighbour@example.com"))
        .await;
    assert_eq!(other.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_disabled_limiter_adds_no_headers() {
    let app = TestApp::new();
    for _ in 0..30 {
        let response = app.send(ping_from("192.0.2.1")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(!response.headers.contains_key("ratelimit-limit"));
    }
}
