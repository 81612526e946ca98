//! Test data factories and the in-memory application

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use scrolljar::{AppHandle, Backends, create_app_with};
use scrolljar_core::Config;
use scrolljar_core::infrastructure::mailer::LogMailer;
use scrolljar_core::infrastructure::storage::MemoryObjectStorage;
use scrolljar_core::infrastructure::{MemoryStore, PasswordHasher, Persistence};

pub const BASE_URL: &str = "https://scrolljar.test";
pub const TEST_SECRET: &str = "integration-test-capability-secret-0123456789";

/// Argon2 parameters cheap enough for tests
pub fn fast_hasher() -> PasswordHasher {
    PasswordHasher::with_params(4096, 1, 1)
}

/// Configuration for an in-memory application with rate limiting off
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.base_url = BASE_URL.to_string();
    config.server.env = "test".to_string();
    config.rate_limit.enabled = false;
    config.auth.capability_secret = TEST_SECRET.to_string();
    config.mailer.retry_delay_ms = 1;
    config
}

/// Application over in-memory backends, with handles on each backend
pub struct TestApp {
    pub handle: AppHandle,
    pub store: MemoryStore,
    pub objects: MemoryObjectStorage,
    pub mailer: LogMailer,
    pub config: Config,
}

/// Decoded response of one request
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = MemoryStore::new();
        Self::with_persistence(config, store.clone(), Persistence::memory(store))
    }

    /// Application over a custom persistence built on `store`
    pub fn with_persistence(config: Config, store: MemoryStore, persistence: Persistence) -> Self {
        let objects = MemoryObjectStorage::new(BASE_URL);
        let mailer = LogMailer::new();

        let handle = create_app_with(
            &config,
            Backends {
                persistence,
                storage: Arc::new(objects.clone()),
                mailer: Arc::new(mailer.clone()),
                hasher: fast_hasher(),
            },
        );

        Self {
            handle,
            store,
            objects,
            mailer,
            config,
        }
    }

    pub fn router(&self) -> Router {
        self.handle.router.clone()
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Create a jar as `bearer` (or anonymously) with `count` untitled scrolls
    pub async fn create_jar(&self, bearer: Option<&str>, count: usize) -> TestResponse {
        let scrolls: Vec<Value> = (0..count)
            .map(|i| json!({ "title": format!("scroll-{i}"), "format": "text" }))
            .collect();
        let request = RequestBuilder::new(Method::POST, "/v1/jar")
            .bearer(bearer)
            .json(json!({ "name": "test jar", "scrolls": scrolls }));
        self.send(request).await
    }

    /// Upload `content` to a scroll with its token
    pub async fn upload(&self, scroll_id: &str, token: &str, content: Vec<u8>) -> TestResponse {
        let request = RequestBuilder::new(Method::POST, &format!("/v1/scroll/{scroll_id}"))
            .header("x-upload-token", token)
            .header(header::CONTENT_TYPE.as_str(), "text/plain")
            .body(content);
        self.send(request).await
    }

    /// Wait for background mail delivery to record `count` messages
    pub async fn wait_for_mail(&self, count: usize) -> Vec<scrolljar_core::domain::mailer::MailMessage> {
        for _ in 0..200 {
            let sent = self.mailer.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} mail messages, got {}", self.mailer.sent().len());
    }

    /// Register, activate and authenticate an account; returns its bearer token
    pub async fn signed_in_user(&self, email: &str) -> String {
        let before = self.mailer.sent().len();
        let registered = self
            .send(RequestBuilder::new(Method::POST, "/v1/user/register").json(json!({
                "username": "tester",
                "email": email,
                "password": "correct horse battery",
            })))
            .await;
        assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.body);

        let mail = self.wait_for_mail(before + 1).await;
        let token = mail[before].data["token"]
            .as_str()
            .expect("activation token in welcome mail")
            .to_string();

        let activated = self
            .send(
                RequestBuilder::new(Method::PUT, "/v1/user/activate")
                    .json(json!({ "token": token })),
            )
            .await;
        assert_eq!(activated.status, StatusCode::OK, "{}", activated.body);

        let auth = self
            .send(RequestBuilder::new(Method::POST, "/v1/user/auth").json(json!({
                "email": email,
                "password": "correct horse battery",
            })))
            .await;
        assert_eq!(auth.status, StatusCode::CREATED, "{}", auth.body);
        auth.body["authorization"]["token"]
            .as_str()
            .expect("authorization token")
            .to_string()
    }
}

/// Small request builder over `http::request::Builder`
pub struct RequestBuilder {
    inner: axum::http::request::Builder,
}

impl RequestBuilder {
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            inner: Request::builder().method(method).uri(uri),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.inner = self.inner.header(name, value);
        self
    }

    /// Socket peer address, as the server's connect info reports it
    pub fn peer(mut self, ip: &str) -> Self {
        let ip: IpAddr = ip.parse().expect("peer ip address");
        self.inner = self.inner.extension(ConnectInfo(SocketAddr::new(ip, 40000)));
        self
    }

    pub fn bearer(self, token: Option<&str>) -> Self {
        match token {
            Some(token) => self.header("authorization", &format!("Bearer {token}")),
            None => self,
        }
    }

    pub fn json(self, body: Value) -> Request<Body> {
        self.header("content-type", "application/json")
            .body(serde_json::to_vec(&body).expect("serializable body"))
    }

    pub fn body(self, body: impl Into<Body>) -> Request<Body> {
        self.inner.body(body.into()).expect("valid request")
    }

    pub fn empty(self) -> Request<Body> {
        self.body(Body::empty())
    }
}

/// Flip one bit of the signature segment of a JWT
pub fn flip_signature_bit(token: &str) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

    let signature_start = token.rfind('.').expect("three-part token") + 1;
    let position = signature_start + 5;
    let mut bytes = token.as_bytes().to_vec();
    let index = ALPHABET
        .iter()
        .position(|&c| c == bytes[position])
        .expect("base64url character");
    bytes[position] = ALPHABET[index ^ 1];
    String::from_utf8(bytes).expect("ascii token")
}
