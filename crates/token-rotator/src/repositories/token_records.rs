use crate::config::DatabaseConfig;
use crate::errors::RotatorError;
use crate::models::TokenRecord;
use crate::observability::metrics::record_storage_operation;
use crate::repositories::{RecordInit, TokenStore};
use secrecy::ExposeSecret;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlSslMode};
use sqlx::{ConnectOptions, Connection};
use std::future::Future;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// TLS policy for one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSecurity {
    /// Local or loopback endpoint: plaintext.
    Plaintext,
    /// Remote endpoint: TLS verified against the CA bundle.
    VerifyCa(PathBuf),
}

impl TransportSecurity {
    /// Decide the policy for `host`.
    ///
    /// Loopback IP literals are always local. Hostnames are local only when
    /// listed in `local_hosts` (compared case-insensitively).
    pub fn for_host(host: &str, local_hosts: &[String], ca_cert_path: &Path) -> Self {
        let host = host.trim().trim_start_matches('[').trim_end_matches(']');
        let loopback_ip = host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback());
        let listed = local_hosts
            .iter()
            .any(|local| local.eq_ignore_ascii_case(host));

        if loopback_ip || listed {
            TransportSecurity::Plaintext
        } else {
            TransportSecurity::VerifyCa(ca_cert_path.to_path_buf())
        }
    }
}

/// Which namespace a connection is opened against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Server,
    Database,
}

impl Scope {
    fn as_str(self) -> &'static str {
        match self {
            Scope::Server => "server",
            Scope::Database => "database",
        }
    }
}

/// MySQL-backed [`TokenStore`].
///
/// Holds no connection between calls. Each operation opens a fresh
/// connection, which both re-validates connectivity after outages and keeps
/// the TLS decision per attempt.
#[derive(Debug, Clone)]
pub struct MySqlTokenStore {
    config: DatabaseConfig,
}

impl MySqlTokenStore {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    pub fn transport_security(&self) -> TransportSecurity {
        TransportSecurity::for_host(
            &self.config.host,
            &self.config.local_hosts,
            &self.config.ca_cert_path,
        )
    }

    fn connect_options(&self, scope: Scope) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(self.config.password.expose_secret());

        if scope == Scope::Database {
            options = options.database(&self.config.database);
        }

        match self.transport_security() {
            TransportSecurity::Plaintext => options.ssl_mode(MySqlSslMode::Disabled),
            TransportSecurity::VerifyCa(ca) => options.ssl_mode(MySqlSslMode::VerifyCa).ssl_ca(ca),
        }
    }

    async fn connect(&self, scope: Scope) -> Result<MySqlConnection, RotatorError> {
        self.connect_options(scope).connect().await.map_err(|e| {
            RotatorError::from_sqlx(&format!("Failed to connect to {}", scope.as_str()), e)
        })
    }

    /// Run one whole operation (connect, statements, close) under a single
    /// deadline. A server that accepts and then stalls counts as unreachable.
    async fn bounded<T, F>(&self, timeout: Duration, operation: F) -> Result<T, RotatorError>
    where
        F: Future<Output = Result<T, RotatorError>>,
    {
        match tokio::time::timeout(timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(RotatorError::Connectivity(format!(
                "Storage operation on {}:{} timed out after {:?}",
                self.config.host, self.config.port, timeout
            ))),
        }
    }

    fn table(&self) -> String {
        format!("`{}`", self.config.table)
    }

    async fn create_schema(
        &self,
        conn: &mut MySqlConnection,
        slot: &str,
    ) -> Result<RecordInit, RotatorError> {
        let database = format!("`{}`", self.config.database);

        sqlx::Executor::execute(
            &mut *conn,
            sqlx::raw_sql(&format!("CREATE DATABASE IF NOT EXISTS {database}")),
        )
        .await
        .map_err(|e| RotatorError::from_sqlx("Failed to create database", e))?;

        sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&format!("USE {database}")))
            .await
            .map_err(|e| RotatorError::from_sqlx("Failed to select database", e))?;

        sqlx::Executor::execute(
            &mut *conn,
            sqlx::raw_sql(&format!(
                r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INT PRIMARY KEY AUTO_INCREMENT,
                AccessToken TEXT,
                Type VARCHAR(255),
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                UNIQUE KEY uq_token_type (Type)
            )
            "#,
                table = self.table()
            )),
        )
        .await
        .map_err(|e| RotatorError::from_sqlx("Failed to create token table", e))?;

        let mut tx = conn
            .begin()
            .await
            .map_err(|e| RotatorError::from_sqlx("Failed to start transaction", e))?;

        let existing: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE Type = ? FOR UPDATE",
            self.table()
        ))
        .bind(slot)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RotatorError::from_sqlx("Failed to count token records", e))?;

        let init = if existing == 0 {
            sqlx::query(&format!(
                "INSERT INTO {} (AccessToken, Type) VALUES ('', ?)",
                self.table()
            ))
            .bind(slot)
            .execute(&mut *tx)
            .await
            .map_err(|e| RotatorError::from_sqlx("Failed to insert token record", e))?;
            RecordInit::Created
        } else {
            RecordInit::AlreadyPresent
        };

        tx.commit()
            .await
            .map_err(|e| RotatorError::from_sqlx("Failed to commit schema init", e))?;

        Ok(init)
    }

    async fn update_token(
        &self,
        conn: &mut MySqlConnection,
        slot: &str,
        token: &str,
    ) -> Result<(), RotatorError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET AccessToken = ?, updated_at = CURRENT_TIMESTAMP WHERE Type = ?",
            self.table()
        ))
        .bind(token)
        .bind(slot)
        .execute(&mut *conn)
        .await
        .map_err(|e| RotatorError::from_sqlx("Failed to update token", e))?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // MySQL reports changed rows, not matched rows: an identical write in
        // the same second affects zero rows without the record being absent.
        let matching: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE Type = ?",
            self.table()
        ))
        .bind(slot)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| RotatorError::from_sqlx("Failed to count token records", e))?;

        if matching == 0 {
            Err(RotatorError::RecordMissing {
                slot: slot.to_string(),
            })
        } else {
            Ok(())
        }
    }

    async fn select_record(
        &self,
        conn: &mut MySqlConnection,
        slot: &str,
    ) -> Result<Option<TokenRecord>, RotatorError> {
        sqlx::query_as::<_, TokenRecord>(&format!(
            r#"
            SELECT Type, COALESCE(AccessToken, '') AS AccessToken, updated_at
            FROM {}
            WHERE Type = ?
            ORDER BY id
            LIMIT 1
            "#,
            self.table()
        ))
        .bind(slot)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RotatorError::from_sqlx("Failed to read token", e))
    }

    async fn ping(&self, scope: Scope, timeout: Duration) -> Result<(), RotatorError> {
        let start = Instant::now();
        let result = self
            .bounded(timeout, async {
                let conn = self.connect(scope).await?;
                release(conn).await;
                Ok(())
            })
            .await;
        record_storage_operation("ping", &result, start.elapsed());
        result
    }
}

/// Close a connection, logging instead of failing: the operation's outcome
/// is already decided when this runs.
async fn release(conn: MySqlConnection) {
    if let Err(e) = conn.close().await {
        debug!(target: "rotator.store", error = %e, "Failed to close connection cleanly");
    }
}

#[async_trait::async_trait]
impl TokenStore for MySqlTokenStore {
    #[instrument(skip_all, name = "rotator.store.ping_server")]
    async fn ping_server(&self, timeout: Duration) -> Result<(), RotatorError> {
        self.ping(Scope::Server, timeout).await
    }

    #[instrument(skip_all, name = "rotator.store.ping_database")]
    async fn ping_database(&self, timeout: Duration) -> Result<(), RotatorError> {
        self.ping(Scope::Database, timeout).await
    }

    #[instrument(skip_all, name = "rotator.store.ensure_schema")]
    async fn ensure_schema(&self, slot: &str) -> Result<RecordInit, RotatorError> {
        let start = Instant::now();
        let result = self
            .bounded(self.config.connect_timeout, async {
                let mut conn = self.connect(Scope::Server).await?;
                let result = self.create_schema(&mut conn, slot).await;
                release(conn).await;
                result
            })
            .await;
        record_storage_operation("ensure_schema", &result, start.elapsed());

        if let Ok(init) = result {
            info!(
                target: "rotator.store",
                database = %self.config.database,
                table = %self.config.table,
                slot = %slot,
                record_created = init == RecordInit::Created,
                "Token schema ready"
            );
        }
        result
    }

    #[instrument(skip_all, name = "rotator.store.upsert")]
    async fn upsert(&self, slot: &str, token: &str) -> Result<(), RotatorError> {
        let start = Instant::now();
        let result = self
            .bounded(self.config.connect_timeout, async {
                let mut conn = self.connect(Scope::Database).await?;
                let result = self.update_token(&mut conn, slot, token).await;
                release(conn).await;
                result
            })
            .await;
        record_storage_operation("upsert", &result, start.elapsed());
        result
    }

    #[instrument(skip_all, name = "rotator.store.read")]
    async fn read(&self, slot: &str) -> Result<Option<TokenRecord>, RotatorError> {
        let start = Instant::now();
        let result = self
            .bounded(self.config.connect_timeout, async {
                let mut conn = self.connect(Scope::Database).await?;
                let result = self.select_record(&mut conn, slot).await;
                release(conn).await;
                result
            })
            .await;
        record_storage_operation("read", &result, start.elapsed());
        result
    }
}
