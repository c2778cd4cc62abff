//! Service configuration.
//!
//! All settings are read from the environment exactly once at startup and
//! frozen into an immutable [`Config`]. Components receive it by reference
//! (usually through an `Arc<Config>`); nothing reads the environment after
//! `from_env` returns.

use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default storage host.
pub const DEFAULT_MYSQL_HOST: &str = "localhost";

/// Default storage port.
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Default database and table name.
pub const DEFAULT_DATABASE_NAME: &str = "arkane_settings";

/// Default slot the rotator maintains.
pub const DEFAULT_SLOT_NAME: &str = "Arkane";

/// Default validity window of a generated token (5 minutes).
pub const DEFAULT_TOKEN_VALIDITY_SECONDS: u64 = 300;

/// Default rotation interval (5 minutes).
pub const DEFAULT_ROTATION_INTERVAL_SECONDS: u64 = 300;

/// Default number of startup connectivity attempts.
pub const DEFAULT_STARTUP_MAX_ATTEMPTS: u32 = 30;

/// Default delay between startup connectivity attempts.
pub const DEFAULT_STARTUP_RETRY_DELAY_SECONDS: u64 = 2;

/// Default timeout for opening a storage connection.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECONDS: u64 = 10;

/// Default timeout used by the `/health` and `/status` handlers.
pub const DEFAULT_HEALTH_CHECK_TIMEOUT_SECONDS: u64 = 5;

/// Hosts that never negotiate TLS unless overridden by `MYSQL_LOCAL_HOSTS`.
/// `mysql` is the conventional compose service name for a sidecar database.
const DEFAULT_LOCAL_HOSTS: &str = "localhost,mysql";

#[derive(Debug, Clone)]
pub struct Config {
    /// Storage connection settings.
    pub database: DatabaseConfig,

    /// Slot (the `Type` column) whose token this process rotates.
    pub slot_name: String,

    /// HS256 signing secret.
    pub signing_secret: SecretString,

    /// Claims stamped into every generated token.
    pub claims: ClaimSettings,

    /// `exp - iat` of every generated token.
    pub token_validity: Duration,

    /// Time between scheduled rotations.
    pub rotation_interval: Duration,

    /// Startup connectivity probe budget.
    pub startup_max_attempts: u32,
    pub startup_retry_delay: Duration,

    /// Connection timeout used by the health handlers.
    pub health_check_timeout: Duration,

    /// Listener for `/health` and `/status`.
    pub health_bind_address: SocketAddr,

    /// Value of the `service` field in health responses.
    pub service_name: String,

    /// Optional Prometheus scrape listener.
    pub metrics_bind_address: Option<SocketAddr>,

    /// Re-run schema initialization when a rotation finds no record.
    pub reensure_on_missing_record: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub database: String,
    pub table: String,
    pub ca_cert_path: PathBuf,
    /// Hostnames treated as local (no TLS negotiation).
    pub local_hosts: Vec<String>,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSettings {
    pub subject: String,
    pub issuer: String,
    pub audience: String,
    pub environment: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },

    #[error("Invalid SQL identifier in {var}: '{value}'")]
    InvalidIdentifier { var: String, value: String },
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let signing_secret = vars
            .get("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;

        let database = DatabaseConfig {
            host: string_or(vars, "MYSQL_HOST", DEFAULT_MYSQL_HOST),
            port: parse_or(vars, "MYSQL_PORT", DEFAULT_MYSQL_PORT)?,
            user: string_or(vars, "MYSQL_USER", "root"),
            password: SecretString::from(string_or(vars, "MYSQL_PASS", "")),
            database: identifier_or(vars, "MYSQL_DB", DEFAULT_DATABASE_NAME)?,
            table: identifier_or(vars, "TOKEN_TABLE", DEFAULT_DATABASE_NAME)?,
            ca_cert_path: PathBuf::from(string_or(vars, "MYSQL_CA_CERT", "ca-certificate.crt")),
            local_hosts: string_or(vars, "MYSQL_LOCAL_HOSTS", DEFAULT_LOCAL_HOSTS)
                .split(',')
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            connect_timeout: seconds_or(
                vars,
                "DB_CONNECT_TIMEOUT_SECONDS",
                DEFAULT_DB_CONNECT_TIMEOUT_SECONDS,
            )?,
        };

        let slot_name = string_or(vars, "TOKEN_SLOT", DEFAULT_SLOT_NAME);
        if slot_name.is_empty() || slot_name.len() > 255 {
            return Err(ConfigError::InvalidValue {
                var: "TOKEN_SLOT".to_string(),
                reason: "must be between 1 and 255 characters".to_string(),
            });
        }

        let claims = ClaimSettings {
            subject: string_or(vars, "JWT_SUBJECT", "arkane_user"),
            issuer: string_or(vars, "JWT_ISSUER", "arkane_system_docker"),
            audience: string_or(vars, "JWT_AUDIENCE", "arkane_services"),
            environment: Some(string_or(vars, "JWT_ENVIRONMENT", "docker"))
                .filter(|e| !e.is_empty()),
        };

        let token_validity =
            seconds_or(vars, "TOKEN_VALIDITY_SECONDS", DEFAULT_TOKEN_VALIDITY_SECONDS)?;
        let rotation_interval = seconds_or(
            vars,
            "ROTATION_INTERVAL_SECONDS",
            DEFAULT_ROTATION_INTERVAL_SECONDS,
        )?;
        for (var, value) in [
            ("TOKEN_VALIDITY_SECONDS", token_validity),
            ("ROTATION_INTERVAL_SECONDS", rotation_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    var: var.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        let startup_max_attempts =
            parse_or(vars, "STARTUP_MAX_ATTEMPTS", DEFAULT_STARTUP_MAX_ATTEMPTS)?;
        if startup_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                var: "STARTUP_MAX_ATTEMPTS".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let health_bind_address = parse_or(
            vars,
            "HEALTH_BIND_ADDRESS",
            SocketAddr::from(([0, 0, 0, 0], 8080)),
        )?;

        let metrics_bind_address = match vars.get("METRICS_BIND_ADDRESS") {
            Some(raw) if !raw.is_empty() => Some(raw.parse().map_err(|e| {
                ConfigError::InvalidValue {
                    var: "METRICS_BIND_ADDRESS".to_string(),
                    reason: format!("{e}"),
                }
            })?),
            _ => None,
        };

        Ok(Config {
            database,
            slot_name,
            signing_secret: SecretString::from(signing_secret.clone()),
            claims,
            token_validity,
            rotation_interval,
            startup_max_attempts,
            startup_retry_delay: seconds_or(
                vars,
                "STARTUP_RETRY_DELAY_SECONDS",
                DEFAULT_STARTUP_RETRY_DELAY_SECONDS,
            )?,
            health_check_timeout: seconds_or(
                vars,
                "HEALTH_CHECK_TIMEOUT_SECONDS",
                DEFAULT_HEALTH_CHECK_TIMEOUT_SECONDS,
            )?,
            health_bind_address,
            service_name: string_or(vars, "SERVICE_NAME", "jwt-mysql-automation"),
            metrics_bind_address,
            reensure_on_missing_record: parse_or(vars, "REENSURE_ON_MISSING_RECORD", false)?,
        })
    }
}

fn string_or(vars: &HashMap<String, String>, var: &str, default: &str) -> String {
    vars.get(var)
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T>(vars: &HashMap<String, String>, var: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match vars.get(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn seconds_or(
    vars: &HashMap<String, String>,
    var: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    parse_or(vars, var, default).map(Duration::from_secs)
}

/// Database and table names are interpolated into DDL, so only plain
/// identifiers are accepted.
fn identifier_or(
    vars: &HashMap<String, String>,
    var: &str,
    default: &str,
) -> Result<String, ConfigError> {
    let value = string_or(vars, var, default);
    let valid = !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');

    if valid {
        Ok(value)
    } else {
        Err(ConfigError::InvalidIdentifier {
            var: var.to_string(),
            value,
        })
    }
}
