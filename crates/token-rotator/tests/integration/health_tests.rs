//! Health endpoint integration tests.
//!
//! Tests `/health` and routing using the `TestRotatorServer` harness.

use reqwest::StatusCode;
use rotator_test_utils::{InMemoryTokenStore, TestRotatorServer};
use std::sync::Arc;
use std::time::Duration;

/// Test that health endpoint returns 200 and healthy status.
#[tokio::test]
async fn test_health_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let store = Arc::new(InMemoryTokenStore::new());
    let server = TestRotatorServer::spawn(store.clone()).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "jwt-mysql-automation");
    assert_eq!(body["database"], "connected");
    assert!(body["timestamp"].is_string());
    assert!(body.get("error").is_none());

    assert_eq!(store.ping_database_calls(), 1);
    assert_eq!(store.read_calls(), 0, "liveness must not read the record");

    Ok(())
}

/// Test that health endpoint returns JSON content type.
#[tokio::test]
async fn test_health_endpoint_returns_json() -> Result<(), anyhow::Error> {
    let server = TestRotatorServer::spawn(Arc::new(InMemoryTokenStore::new())).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok());

    assert!(
        content_type.is_some_and(|ct| ct.contains("application/json")),
        "Expected application/json content type, got {:?}",
        content_type
    );

    Ok(())
}

/// Test that an unreachable database yields 503 with the failure description.
#[tokio::test]
async fn test_health_returns_503_when_database_down() -> Result<(), anyhow::Error> {
    let store = Arc::new(InMemoryTokenStore::new());
    let server = TestRotatorServer::spawn(store.clone()).await?;
    store.set_database_down(true);

    let response = reqwest::get(format!("{}/health", server.url())).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["service"], "jwt-mysql-automation");
    assert!(body["error"]
        .as_str()
        .is_some_and(|e| e.contains("connection refused")));
    assert!(body.get("database").is_none());

    // Recovers as soon as storage does.
    store.set_database_down(false);
    let response = reqwest::get(format!("{}/health", server.url())).await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

/// Test that non-existent routes return an empty 404.
#[tokio::test]
async fn test_unknown_route_returns_empty_404() -> Result<(), anyhow::Error> {
    let server = TestRotatorServer::spawn(Arc::new(InMemoryTokenStore::new())).await?;

    for path in ["/", "/nonexistent", "/health/extra", "/v1/status"] {
        let response = reqwest::get(format!("{}{}", server.url(), path)).await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "path {path}");
        assert!(response.text().await?.is_empty(), "path {path}");
    }

    Ok(())
}

/// Test that writes to the read-only endpoints are rejected.
#[tokio::test]
async fn test_post_to_health_is_method_not_allowed() -> Result<(), anyhow::Error> {
    let store = Arc::new(InMemoryTokenStore::new());
    let server = TestRotatorServer::spawn(store.clone()).await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/health", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(store.ping_database_calls(), 0);

    Ok(())
}

/// Test that a stalled database ping answers 503 within the health check timeout.
#[tokio::test]
async fn test_health_returns_503_when_storage_stalls() -> Result<(), anyhow::Error> {
    let store = Arc::new(InMemoryTokenStore::new());
    let config = rotator_test_utils::test_config_with(&[("HEALTH_CHECK_TIMEOUT_SECONDS", "1")]);
    let server = TestRotatorServer::spawn_with_config(store.clone(), config).await?;
    store.stall_queries(Duration::from_secs(60));

    let response = reqwest::get(format!("{}/health", server.url())).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "unhealthy");
    assert!(body["error"].as_str().unwrap().contains("no answer within 1s"));

    Ok(())
}
