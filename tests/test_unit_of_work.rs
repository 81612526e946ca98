//! Multi-row writes commit together or not at all

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use std::sync::Arc;

use common::*;
use scrolljar_core::application::{
    ApplicationError, CreateJarCommand, CreateJarUseCase, ScrollDraft,
};
use scrolljar_core::config::JarsConfig;
use scrolljar_core::domain::auth::Principal;
use scrolljar_core::domain::store::StoreError;
use scrolljar_core::infrastructure::{CapabilityTokenService, MemoryStore, Persistence};

fn command_with_scrolls(count: usize) -> CreateJarCommand {
    CreateJarCommand {
        name: "atomic".to_string(),
        scrolls: (0..count)
            .map(|i| ScrollDraft {
                title: Some(format!("part {i}")),
                format: None,
            })
            .collect(),
        ..Default::default()
    }
}

fn capabilities() -> Arc<CapabilityTokenService> {
    Arc::new(CapabilityTokenService::new(
        TEST_SECRET,
        std::time::Duration::from_secs(300),
    ))
}

// ============================================================================
// Use case level
// ============================================================================

#[tokio::test]
async fn test_failed_second_scroll_leaves_zero_rows() {
    let store = MemoryStore::new();
    let units = Arc::new(FailingUnitOfWorkFactory::new(Arc::new(store.clone()), 2));
    let use_case = CreateJarUseCase::new(
        units.clone(),
        fast_hasher(),
        capabilities(),
        JarsConfig::default(),
    );

    let result = use_case
        .execute(&Principal::Anonymous, command_with_scrolls(3))
        .await;

    assert!(matches!(
        result,
        Err(ApplicationError::TransactionFailure(StoreError::Backend(_)))
    ));
    assert_eq!(store.jar_count(), 0);
    assert_eq!(store.scroll_count(), 0);
    assert_eq!(units.rollbacks(), 1);
    assert_eq!(units.commits(), 0);
}

#[tokio::test]
async fn test_successful_creation_commits_every_row() {
    let store = MemoryStore::new();
    let units = Arc::new(FailingUnitOfWorkFactory::new(Arc::new(store.clone()), 0));
    let use_case = CreateJarUseCase::new(
        units.clone(),
        fast_hasher(),
        capabilities(),
        JarsConfig::default(),
    );

    let result = use_case
        .execute(&Principal::Anonymous, command_with_scrolls(3))
        .await
        .unwrap();

    assert_eq!(result.scrolls.len(), 3);
    assert_eq!(store.jar_count(), 1);
    assert_eq!(store.scroll_count(), 3);
    assert_eq!(units.commits(), 1);
    assert_eq!(units.rollbacks(), 0);
}

#[tokio::test]
async fn test_validation_failure_opens_no_unit_of_work() {
    let store = MemoryStore::new();
    let units = Arc::new(FailingUnitOfWorkFactory::new(Arc::new(store.clone()), 0));
    let use_case = CreateJarUseCase::new(
        units.clone(),
        fast_hasher(),
        capabilities(),
        JarsConfig::default(),
    );

    let command = CreateJarCommand {
        name: "x".repeat(300),
        ..command_with_scrolls(1)
    };
    let result = use_case.execute(&Principal::Anonymous, command).await;

    assert!(matches!(result, Err(ApplicationError::Validation { .. })));
    assert_eq!(units.commits() + units.rollbacks(), 0);
    assert_eq!(store.jar_count(), 0);
}

// ============================================================================
// HTTP level
// ============================================================================

#[tokio::test]
async fn test_failed_jar_creation_over_http_is_500_and_persists_nothing() {
    let store = MemoryStore::new();
    let persistence = Persistence {
        units: Arc::new(FailingUnitOfWorkFactory::new(Arc::new(store.clone()), 2)),
        ..Persistence::memory(store.clone())
    };
    let app = TestApp::with_persistence(test_config(), store, persistence);

    let response = app.create_jar(None, 3).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["code"], "INTERNAL_ERROR");
    assert_eq!(app.store.jar_count(), 0);
    assert_eq!(app.store.scroll_count(), 0);
}

#[tokio::test]
async fn test_registration_writes_user_and_token_together() {
    let app = TestApp::new();

    let response = app
        .send(
            RequestBuilder::new(Method::POST, "/v1/user/register").json(json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "correct horse battery",
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(app.store.user_count(), 1);

    // Same email again is rejected and adds nothing
    let duplicate = app
        .send(
            RequestBuilder::new(Method::POST, "/v1/user/register").json(json!({
                "username": "alice2",
                "email": "alice@example.com",
                "password": "correct horse battery",
            })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.store.user_count(), 1);
}
