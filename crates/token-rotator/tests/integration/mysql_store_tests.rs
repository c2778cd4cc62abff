//! `MySqlTokenStore` against a real server.
//!
//! Ignored by default. Run with a disposable MySQL:
//!
//! ```text
//! TEST_MYSQL_HOST=127.0.0.1 TEST_MYSQL_PASS=secret \
//!     cargo test -p token-rotator --test integration_tests -- --ignored mysql
//! ```
//!
//! Each test uses its own table so runs never interfere.

use chrono::Utc;
use rotator_test_utils::test_config_with;
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
use sqlx::{ConnectOptions, Connection};
use std::time::Duration;
use token_rotator::config::DatabaseConfig;
use token_rotator::errors::RotatorError;
use token_rotator::repositories::{MySqlTokenStore, RecordInit, TokenStore};

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn database_config(test_name: &str) -> DatabaseConfig {
    let table = format!("rotator_{}_{}", test_name, Utc::now().timestamp_micros());
    let host = env_or("TEST_MYSQL_HOST", "127.0.0.1");
    let port = env_or("TEST_MYSQL_PORT", "3306");
    let user = env_or("TEST_MYSQL_USER", "root");
    let pass = env_or("TEST_MYSQL_PASS", "");
    let db = env_or("TEST_MYSQL_DB", "rotator_test");

    test_config_with(&[
        ("MYSQL_HOST", host.as_str()),
        ("MYSQL_PORT", port.as_str()),
        ("MYSQL_USER", user.as_str()),
        ("MYSQL_PASS", pass.as_str()),
        ("MYSQL_DB", db.as_str()),
        ("TOKEN_TABLE", table.as_str()),
        ("MYSQL_LOCAL_HOSTS", "localhost,mysql,127.0.0.1"),
    ])
    .database
}

async fn row_count(config: &DatabaseConfig, slot: &str) -> i64 {
    use secrecy::ExposeSecret;

    let mut conn = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(config.password.expose_secret())
        .database(&config.database)
        .ssl_mode(MySqlSslMode::Disabled)
        .connect()
        .await
        .unwrap();
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM `{}` WHERE Type = ?",
        config.table
    ))
    .bind(slot)
    .fetch_one(&mut conn)
    .await
    .unwrap();
    conn.close().await.unwrap();
    count
}

/// Schema init is idempotent: one record per slot no matter how often it runs.
#[tokio::test]
#[ignore = "requires MySQL (TEST_MYSQL_HOST)"]
async fn test_mysql_ensure_schema_is_idempotent() -> Result<(), anyhow::Error> {
    let config = database_config("idempotent");
    let store = MySqlTokenStore::new(config.clone());

    assert_eq!(store.ensure_schema("Arkane").await?, RecordInit::Created);
    for _ in 0..4 {
        assert_eq!(store.ensure_schema("Arkane").await?, RecordInit::AlreadyPresent);
    }
    assert_eq!(row_count(&config, "Arkane").await, 1);

    let record = store.read("Arkane").await?.unwrap();
    assert_eq!(record.token_value, "");
    assert!(record.updated_at.is_some());

    Ok(())
}

/// Upsert replaces the token and read returns it.
#[tokio::test]
#[ignore = "requires MySQL (TEST_MYSQL_HOST)"]
async fn test_mysql_upsert_then_read() -> Result<(), anyhow::Error> {
    let config = database_config("upsert");
    let store = MySqlTokenStore::new(config.clone());
    store.ensure_schema("Arkane").await?;

    store.upsert("Arkane", "first-token").await?;
    // Same value again: zero changed rows but the record exists.
    store.upsert("Arkane", "first-token").await?;
    store.upsert("Arkane", "second-token").await?;

    let record = store.read("Arkane").await?.unwrap();
    assert_eq!(record.token_value, "second-token");
    assert_eq!(row_count(&config, "Arkane").await, 1);

    Ok(())
}

/// Writing to a slot without a record is a distinguishable condition.
#[tokio::test]
#[ignore = "requires MySQL (TEST_MYSQL_HOST)"]
async fn test_mysql_upsert_unknown_slot_is_record_missing() -> Result<(), anyhow::Error> {
    let store = MySqlTokenStore::new(database_config("missing"));
    store.ensure_schema("Arkane").await?;

    let result = store.upsert("Unknown", "token").await;
    assert!(matches!(result, Err(RotatorError::RecordMissing { .. })));
    assert!(store.read("Unknown").await?.is_none());

    Ok(())
}

/// Both pings succeed against a reachable server.
#[tokio::test]
#[ignore = "requires MySQL (TEST_MYSQL_HOST)"]
async fn test_mysql_pings() -> Result<(), anyhow::Error> {
    let store = MySqlTokenStore::new(database_config("ping"));
    store.ping_server(Duration::from_secs(5)).await?;
    store.ensure_schema("Arkane").await?;
    store.ping_database(Duration::from_secs(5)).await?;
    Ok(())
}
