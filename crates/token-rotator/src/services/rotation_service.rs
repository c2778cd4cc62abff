//! Token rotation.
//!
//! One rotation signs a fresh token and writes it over the slot's record.
//! Storage errors propagate to the caller (the scheduler logs them and
//! tries again next tick); a missing record is an outcome, not an error.

use crate::config::Config;
use crate::crypto;
use crate::errors::RotatorError;
use crate::observability::metrics::{record_rotation, set_last_rotation_timestamp};
use crate::repositories::TokenStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// What a single rotation achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// The token was replaced.
    Rotated,
    /// No record matched the slot; nothing was written.
    RecordMissing,
    /// No record matched, the schema was re-ensured and the write retried.
    Reinitialized,
}

impl RotationOutcome {
    fn as_label(self) -> &'static str {
        match self {
            RotationOutcome::Rotated => "rotated",
            RotationOutcome::RecordMissing => "record_missing",
            RotationOutcome::Reinitialized => "reinitialized",
        }
    }
}

#[derive(Clone)]
pub struct TokenRotator {
    store: Arc<dyn TokenStore>,
    config: Arc<Config>,
}

impl TokenRotator {
    pub fn new(store: Arc<dyn TokenStore>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    /// Sign and persist a fresh token for the configured slot.
    #[instrument(skip_all, name = "rotator.rotate", fields(slot = %self.config.slot_name))]
    pub async fn rotate_once(&self) -> Result<RotationOutcome, RotatorError> {
        let start = Instant::now();
        let result = self.rotate_inner().await;

        let status = match &result {
            Ok(outcome) => outcome.as_label(),
            Err(e) => e.category(),
        };
        record_rotation(status, start.elapsed());

        result
    }

    async fn rotate_inner(&self) -> Result<RotationOutcome, RotatorError> {
        let slot = self.config.slot_name.as_str();
        let token = crypto::sign_token(
            &self.config.claims,
            &self.config.signing_secret,
            self.config.token_validity,
        )?;

        let outcome = match self.store.upsert(slot, &token).await {
            Ok(()) => RotationOutcome::Rotated,
            Err(RotatorError::RecordMissing { .. }) if self.config.reensure_on_missing_record => {
                warn!(
                    target: "rotator.rotate",
                    slot = %slot,
                    "Token record missing, re-creating it before writing"
                );
                self.store.ensure_schema(slot).await?;
                self.store.upsert(slot, &token).await?;
                RotationOutcome::Reinitialized
            }
            Err(RotatorError::RecordMissing { .. }) => {
                warn!(
                    target: "rotator.rotate",
                    slot = %slot,
                    "Token update matched no record; token not written"
                );
                return Ok(RotationOutcome::RecordMissing);
            }
            Err(e) => return Err(e),
        };

        set_last_rotation_timestamp(Utc::now().timestamp());
        self.log_token_summary(&token);
        Ok(outcome)
    }

    /// Log expiry details of the token just written. Never logs the token.
    fn log_token_summary(&self, token: &str) {
        match crypto::inspect_token(token, &self.config.signing_secret) {
            Ok(inspection) => {
                let now = Utc::now();
                info!(
                    target: "rotator.rotate",
                    slot = %self.config.slot_name,
                    jti = %inspection.claims.jti,
                    expires_at = inspection.claims.exp,
                    seconds_left = inspection.time_left(now).as_secs(),
                    token_len = token.len(),
                    "Token rotated"
                );
            }
            Err(e) => {
                debug!(target: "rotator.rotate", error = %e, "Could not summarize rotated token");
            }
        }
    }
}
