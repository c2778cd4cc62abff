use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Persisted token for one slot (maps to the token table).
#[derive(Clone, PartialEq, Eq, FromRow)]
pub struct TokenRecord {
    #[sqlx(rename = "Type")]
    pub slot_name: String,
    /// Signed token; empty until the first rotation.
    #[sqlx(rename = "AccessToken")]
    pub token_value: String,
    /// Set by storage on every write.
    pub updated_at: Option<DateTime<Utc>>,
}

/// The token value is a live credential and never reaches logs.
impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("slot_name", &self.slot_name)
            .field("token_value", &"[REDACTED]")
            .field("token_len", &self.token_value.len())
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl TokenRecord {
    pub fn has_token(&self) -> bool {
        !self.token_value.is_empty()
    }
}

/// `GET /health` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: String,
    pub service: String,
    pub database: String,
}

/// `GET /status` success body. Reports presence and freshness, never the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: String,
    pub timestamp: String,
    pub service: String,
    pub database: String,
    pub token_exists: bool,
    pub last_update: Option<String>,
}

/// 503 body shared by `/health` (`unhealthy`) and `/status` (`error`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    pub status: String,
    pub timestamp: String,
    pub service: String,
    pub error: String,
}
