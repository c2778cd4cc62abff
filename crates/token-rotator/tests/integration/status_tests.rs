//! Status endpoint integration tests.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;
use rotator_test_utils::{InMemoryTokenStore, TestRotatorServer};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Test that an existing record reports presence and its last write time.
#[tokio::test]
async fn test_status_reports_existing_token() -> Result<(), anyhow::Error> {
    let written = Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
    let store = Arc::new(InMemoryTokenStore::new().with_record(
        "Arkane",
        "eyJhbGciOiJIUzI1NiJ9.payload.signature",
        written,
    ));
    let server = TestRotatorServer::spawn(store).await?;

    let response = reqwest::get(format!("{}/status", server.url())).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "operational");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["service"], "jwt-mysql-automation");
    assert_eq!(body["token_exists"], true);

    let last_update = body["last_update"].as_str().unwrap();
    assert_eq!(DateTime::parse_from_rfc3339(last_update)?, written);

    Ok(())
}

/// Test that the token value never appears in the status response.
#[tokio::test]
async fn test_status_never_returns_token_value() -> Result<(), anyhow::Error> {
    let token = "eyJhbGciOiJIUzI1NiJ9.very-secret-payload.signature";
    let store = Arc::new(InMemoryTokenStore::new().with_record("Arkane", token, Utc::now()));
    let server = TestRotatorServer::spawn(store).await?;

    let text = reqwest::get(format!("{}/status", server.url()))
        .await?
        .text()
        .await?;
    assert!(!text.contains("very-secret-payload"));
    assert!(!text.contains("AccessToken"));

    Ok(())
}

/// Test that a slot without a record is a normal 200 with token_exists=false.
#[tokio::test]
async fn test_status_without_record_is_not_an_error() -> Result<(), anyhow::Error> {
    let server = TestRotatorServer::spawn(Arc::new(InMemoryTokenStore::new())).await?;

    let response = reqwest::get(format!("{}/status", server.url())).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "operational");
    assert_eq!(body["token_exists"], false);
    assert!(body["last_update"].is_null());

    Ok(())
}

/// Test that a storage failure becomes a 503 with status "error".
#[tokio::test]
async fn test_status_returns_503_when_database_down() -> Result<(), anyhow::Error> {
    let store = Arc::new(InMemoryTokenStore::new().with_record("Arkane", "t", Utc::now()));
    let server = TestRotatorServer::spawn(store.clone()).await?;
    store.set_database_down(true);

    let response = reqwest::get(format!("{}/status", server.url())).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "error");
    assert!(body["error"].is_string());
    assert!(body.get("token_exists").is_none());

    Ok(())
}

/// Test that the configured slot is the one reported.
#[tokio::test]
async fn test_status_uses_configured_slot() -> Result<(), anyhow::Error> {
    let store = Arc::new(InMemoryTokenStore::new().with_record("Arkane", "t", Utc::now()));
    let config = rotator_test_utils::test_config_with(&[("TOKEN_SLOT", "Other")]);
    let server = TestRotatorServer::spawn_with_config(store, config).await?;

    let body: serde_json::Value = reqwest::get(format!("{}/status", server.url()))
        .await?
        .json()
        .await?;
    assert_eq!(body["token_exists"], false);

    Ok(())
}

/// Test that a store which stops answering yields a 503 body within the
/// health check timeout rather than the listener's bare request timeout.
#[tokio::test]
async fn test_status_returns_503_when_storage_stalls() -> Result<(), anyhow::Error> {
    let store = Arc::new(InMemoryTokenStore::new().with_record("Arkane", "t", Utc::now()));
    let config = rotator_test_utils::test_config_with(&[("HEALTH_CHECK_TIMEOUT_SECONDS", "1")]);
    let server = TestRotatorServer::spawn_with_config(store.clone(), config).await?;
    store.stall_queries(Duration::from_secs(60));

    let start = Instant::now();
    let response = reqwest::get(format!("{}/status", server.url())).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(start.elapsed() < Duration::from_secs(4));

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "error");
    assert!(body["error"].as_str().unwrap().contains("no answer within 1s"));

    Ok(())
}
