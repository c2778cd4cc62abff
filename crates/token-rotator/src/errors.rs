use thiserror::Error;

#[derive(Debug, Error)]
pub enum RotatorError {
    /// Storage could not be reached (refused, timed out, TLS failure).
    #[error("Storage connectivity error: {0}")]
    Connectivity(String),

    /// Storage was reached but the statement failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An update matched no row: the one-record-per-slot invariant is broken.
    #[error("No token record exists for slot '{slot}'")]
    RecordMissing { slot: String },

    #[error("Signing configuration error: {0}")]
    SigningConfiguration(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl RotatorError {
    /// Classify a sqlx error as a transport failure or a statement failure.
    pub fn from_sqlx(context: &str, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => {
                RotatorError::Connectivity(format!("{context}: {err}"))
            }
            sqlx::Error::Protocol(_) => RotatorError::Connectivity(format!("{context}: {err}")),
            other => RotatorError::Database(format!("{context}: {other}")),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, RotatorError::Connectivity(_))
    }

    /// Bounded label for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            RotatorError::Connectivity(_) => "connectivity",
            RotatorError::Database(_) => "database",
            RotatorError::RecordMissing { .. } => "record_missing",
            RotatorError::SigningConfiguration(_) => "signing",
            RotatorError::InvalidToken(_) => "invalid_token",
        }
    }
}
