//! End-to-end tests of the HTTP surface over in-memory backends

mod common;

use axum::http::{Method, StatusCode, header};
use serde_json::json;

use common::*;

fn varies_on_authorization(response: &TestResponse) -> bool {
    response
        .headers
        .get_all(header::VARY)
        .iter()
        .any(|value| value.as_bytes().eq_ignore_ascii_case(b"authorization"))
}

// ============================================================================
// Health and routing
// ============================================================================

#[tokio::test]
async fn test_ping_reports_running() {
    let app = TestApp::new();
    let response = app
        .send(RequestBuilder::new(Method::GET, "/v1/ping").empty())
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "running");
    assert_eq!(response.body["environment"], "test");
    assert!(!response.body["version"].as_str().unwrap().is_empty());
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_unknown_route_is_structured_404() {
    let app = TestApp::new();
    let response = app
        .send(RequestBuilder::new(Method::GET, "/v1/nothing/here").empty())
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["code"], "NOT_FOUND");
    assert_eq!(
        response.body["request_id"].as_str().unwrap(),
        response.headers["x-request-id"].to_str().unwrap()
    );
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = TestApp::new();
    let response = app
        .send(RequestBuilder::new(Method::GET, "/api-docs/openapi.json").empty())
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let paths = response.body["paths"].as_object().unwrap();
    for path in ["/v1/ping", "/v1/jar", "/v1/scroll/{id}", "/v1/user/register"] {
        assert!(paths.contains_key(path), "missing {path}");
    }
    assert!(response.body["components"]["securitySchemes"]["bearer_token"].is_object());
}

#[tokio::test]
async fn test_docs_route_absent_when_disabled() {
    let mut config = test_config();
    config.server.enable_docs = false;
    let app = TestApp::with_config(config);

    let response = app
        .send(RequestBuilder::new(Method::GET, "/api-docs/openapi.json").empty())
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Jars
// ============================================================================

#[tokio::test]
async fn test_anonymous_jar_lifecycle() {
    let app = TestApp::new();
    let created = app.create_jar(None, 2).await;

    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let jar_id = created.body["jar"]["id"].as_str().unwrap().to_string();
    assert_eq!(jar_id.len(), 8);
    assert_eq!(created.body["jar"]["owner_id"], serde_json::Value::Null);
    assert_eq!(created.body["jar"]["uri"], format!("{BASE_URL}/jar/{jar_id}"));
    assert_eq!(created.body["scrolls"].as_array().unwrap().len(), 2);
    assert_eq!(created.body["scrolls"][0]["scroll"]["state"], "created");

    let fetched = app
        .send(RequestBuilder::new(Method::GET, &format!("/v1/jar/{jar_id}")).empty())
        .await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["name"], "test jar");

    let scrolls = app
        .send(RequestBuilder::new(Method::GET, &format!("/v1/jar/{jar_id}/scrolls")).empty())
        .await;
    assert_eq!(scrolls.status, StatusCode::OK);
    assert_eq!(scrolls.body["scrolls"].as_array().unwrap().len(), 2);

    // Anonymous jars cannot be deleted by anyone
    let deleted = app
        .send(RequestBuilder::new(Method::DELETE, &format!("/v1/jar/{jar_id}")).empty())
        .await;
    assert_eq!(deleted.status, StatusCode::UNAUTHORIZED);
    assert_eq!(deleted.body["code"], "AUTHENTICATION_REQUIRED");
}

#[tokio::test]
async fn test_private_jar_requires_paste_password() {
    let app = TestApp::new();
    let created = app
        .send(RequestBuilder::new(Method::POST, "/v1/jar").json(json!({
            "name": "secret",
            "access": "private",
            "password": "open sesame",
            "scrolls": [{ "title": "notes" }],
        })))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["jar"]["access"], "private");
    let jar_id = created.body["jar"]["id"].as_str().unwrap();
    let path = format!("/v1/jar/{jar_id}");

    let missing = app.send(RequestBuilder::new(Method::GET, &path).empty()).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let wrong = app
        .send(
            RequestBuilder::new(Method::GET, &path)
                .header("x-paste-password", "guess")
                .empty(),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["code"], "INVALID_CREDENTIALS");

    let right = app
        .send(
            RequestBuilder::new(Method::GET, &path)
                .header("x-paste-password", "open sesame")
                .empty(),
        )
        .await;
    assert_eq!(right.status, StatusCode::OK);
    assert!(right.body.get("password").is_none());
    assert!(right.body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_create_jar_validation_reports_every_field() {
    let app = TestApp::new();
    let response = app
        .send(RequestBuilder::new(Method::POST, "/v1/jar").json(json!({
            "name": "n".repeat(300),
            "access": "private",
            "expiry": -5,
        })))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");
    let fields: Vec<String> = response.body["details"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|error| error["field"][0].as_str().unwrap().to_string())
        .collect();
    for field in ["name", "password", "expiry"] {
        assert!(fields.iter().any(|f| f == field), "missing {field} in {fields:?}");
    }
    assert!(app.store.jar_count() == 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();
    let response = app
        .send(
            RequestBuilder::new(Method::POST, "/v1/jar")
                .header(header::CONTENT_TYPE.as_str(), "application/json")
                .body("{ not json"),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_owned_jar_delete_and_listing() {
    let app = TestApp::new();
    let owner = app.signed_in_user("owner@example.com").await;
    let stranger = app.signed_in_user("stranger@example.com").await;

    let created = app.create_jar(Some(&owner), 1).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert!(created.body["jar"]["owner_id"].is_i64());
    let jar_id = created.body["jar"]["id"].as_str().unwrap().to_string();

    let mine = app
        .send(RequestBuilder::new(Method::GET, "/v1/user/jars").bearer(Some(&owner)).empty())
        .await;
    assert_eq!(mine.status, StatusCode::OK);
    assert_eq!(mine.body["jars"][0]["id"], jar_id.as_str());

    let theirs = app
        .send(RequestBuilder::new(Method::GET, "/v1/user/jars").bearer(Some(&stranger)).empty())
        .await;
    assert_eq!(theirs.body["jars"].as_array().unwrap().len(), 0);

    let path = format!("/v1/jar/{jar_id}");
    let forbidden = app
        .send(RequestBuilder::new(Method::DELETE, &path).bearer(Some(&stranger)).empty())
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let deleted = app
        .send(RequestBuilder::new(Method::DELETE, &path).bearer(Some(&owner)).empty())
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = app.send(RequestBuilder::new(Method::GET, &path).empty()).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_scroll_to_owned_jar() {
    let app = TestApp::new();
    let owner = app.signed_in_user("adder@example.com").await;
    let created = app.create_jar(Some(&owner), 0).await;
    let jar_id = created.body["jar"]["id"].as_str().unwrap();
    let path = format!("/v1/jar/{jar_id}/scrolls");

    let added = app
        .send(
            RequestBuilder::new(Method::POST, &path)
                .bearer(Some(&owner))
                .json(json!({ "title": "late.txt", "format": "text" })),
        )
        .await;
    assert_eq!(added.status, StatusCode::CREATED, "{}", added.body);
    assert_eq!(added.body["scroll"]["title"], "late.txt");
    assert!(added.body["upload_token"].is_string());

    let anonymous = app
        .send(RequestBuilder::new(Method::POST, &path).json(json!({ "title": "x" })))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Users and tokens
// ============================================================================

#[tokio::test]
async fn test_register_activate_authenticate() {
    let app = TestApp::new();
    let registered = app
        .send(RequestBuilder::new(Method::POST, "/v1/user/register").json(json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "correct horse battery",
        })))
        .await;
    assert_eq!(registered.status, StatusCode::CREATED);
    assert_eq!(registered.body["activated"], false);
    assert!(registered.body.get("password").is_none());

    // Inactive accounts cannot sign in
    let early = app
        .send(RequestBuilder::new(Method::POST, "/v1/user/auth").json(json!({
            "email": "alice@example.com",
            "password": "correct horse battery",
        })))
        .await;
    assert_eq!(early.status, StatusCode::FORBIDDEN);
    assert_eq!(early.body["code"], "INACTIVE_ACCOUNT");

    let mail = app.wait_for_mail(1).await;
    assert_eq!(mail[0].recipient, "alice@example.com");
    let token = mail[0].data["token"].as_str().unwrap().to_string();

    let activated = app
        .send(RequestBuilder::new(Method::PUT, "/v1/user/activate").json(json!({ "token": token })))
        .await;
    assert_eq!(activated.status, StatusCode::OK);
    assert_eq!(activated.body["activated"], true);

    // Activation tokens are single use
    let again = app
        .send(RequestBuilder::new(Method::PUT, "/v1/user/activate").json(json!({ "token": token })))
        .await;
    assert_eq!(again.status, StatusCode::UNPROCESSABLE_ENTITY);

    let wrong = app
        .send(RequestBuilder::new(Method::POST, "/v1/user/auth").json(json!({
            "email": "alice@example.com",
            "password": "wrong password",
        })))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["code"], "INVALID_CREDENTIALS");

    let auth = app
        .send(RequestBuilder::new(Method::POST, "/v1/user/auth").json(json!({
            "email": "alice@example.com",
            "password": "correct horse battery",
        })))
        .await;
    assert_eq!(auth.status, StatusCode::CREATED);
    let bearer = auth.body["authorization"]["token"].as_str().unwrap();
    assert!(auth.body["refresh"]["token"].is_string());

    let me = app
        .send(RequestBuilder::new(Method::GET, "/v1/user").bearer(Some(bearer)).empty())
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["email"], "alice@example.com");
}

#[tokio::test]
async fn test_bearer_errors_and_vary_header() {
    let app = TestApp::new();

    let anonymous = app
        .send(RequestBuilder::new(Method::GET, "/v1/user").empty())
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["code"], "AUTHENTICATION_REQUIRED");
    assert!(varies_on_authorization(&anonymous));

    let unknown = app
        .send(
            RequestBuilder::new(Method::GET, "/v1/ping")
                .bearer(Some("0123456789abcdef0123456789abcdef"))
                .empty(),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.body["code"], "INVALID_AUTHENTICATION_TOKEN");

    let malformed = app
        .send(
            RequestBuilder::new(Method::GET, "/v1/ping")
                .header("authorization", "Basic dXNlcjpwYXNz")
                .empty(),
        )
        .await;
    assert_eq!(malformed.status, StatusCode::UNAUTHORIZED);
    assert!(varies_on_authorization(&malformed));
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let app = TestApp::new();
    let body = json!({
        "username": "dup",
        "email": "dup@example.com",
        "password": "correct horse battery",
    });

    let first = app
        .send(RequestBuilder::new(Method::POST, "/v1/user/register").json(body.clone()))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = app
        .send(RequestBuilder::new(Method::POST, "/v1/user/register").json(body))
        .await;
    assert_eq!(second.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(second.body["details"]["fields"][0]["field"][0], "email");
}

#[tokio::test]
async fn test_new_activation_token_is_mailed() {
    let app = TestApp::new();
    app.send(RequestBuilder::new(Method::POST, "/v1/user/register").json(json!({
        "username": "bob",
        "email": "bob@example.com",
        "password": "correct horse battery",
    })))
    .await;
    app.wait_for_mail(1).await;

    let response = app
        .send(RequestBuilder::new(Method::POST, "/v1/token/activation").json(json!({
            "email": "bob@example.com",
            "password": "correct horse battery",
        })))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.body["expiry"].is_string());
    assert!(response.body.get("token").is_none());

    let mail = app.wait_for_mail(2).await;
    let fresh = mail[1].data["token"].as_str().unwrap().to_string();
    let activated = app
        .send(RequestBuilder::new(Method::PUT, "/v1/user/activate").json(json!({ "token": fresh })))
        .await;
    assert_eq!(activated.status, StatusCode::OK);

    let repeat = app
        .send(RequestBuilder::new(Method::POST, "/v1/token/activation").json(json!({
            "email": "bob@example.com",
            "password": "correct horse battery",
        })))
        .await;
    assert_eq!(repeat.status, StatusCode::CONFLICT);
    assert_eq!(repeat.body["code"], "ALREADY_ACTIVATED");
}
