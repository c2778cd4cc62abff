//! Token signing and inspection.
//!
//! Tokens are compact HS256 JWTs carrying a fixed subject/issuer/audience,
//! an `iat`/`exp` pair one validity window apart, and a `jti` derived from
//! the issue time. Signing is pure: the only input besides the arguments is
//! the wall clock.

use crate::config::ClaimSettings;
use crate::errors::RotatorError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::instrument;

/// Maximum token size accepted by [`inspect_token`] (4KB).
///
/// Tokens written by this service are ~300 bytes; anything near this limit
/// did not come from here and is rejected before decoding.
const MAX_TOKEN_SIZE_BYTES: usize = 4096;

/// Generic message for every inspection failure.
const INVALID_TOKEN_MESSAGE: &str = "The token is malformed or its signature is invalid";

/// Claims of a rotated token.
///
/// Constructed fresh for every rotation and discarded after signing.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per generation: issue time in microseconds.
    pub jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

/// Redacts `sub`, which identifies the consuming deployment.
impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("jti", &self.jti)
            .field("env", &self.env)
            .finish()
    }
}

impl TokenClaims {
    /// Build claims for a token issued at `now`.
    pub fn issue(template: &ClaimSettings, validity: Duration, now: DateTime<Utc>) -> Self {
        let iat = now.timestamp();
        let validity_secs = i64::try_from(validity.as_secs()).unwrap_or(i64::MAX);

        Self {
            sub: template.subject.clone(),
            iss: template.issuer.clone(),
            aud: template.audience.clone(),
            iat,
            exp: iat.saturating_add(validity_secs),
            jti: now.timestamp_micros().to_string(),
            env: template.environment.clone(),
        }
    }

    /// Seconds between issue and expiry.
    pub fn validity_seconds(&self) -> i64 {
        self.exp - self.iat
    }
}

/// Result of decoding a stored token.
#[derive(Debug, Clone)]
pub struct TokenInspection {
    pub claims: TokenClaims,
    /// `exp` is in the past. Expired tokens still inspect successfully.
    pub expired: bool,
}

impl TokenInspection {
    /// Remaining lifetime, zero once expired.
    pub fn time_left(&self, now: DateTime<Utc>) -> Duration {
        let secs = self.claims.exp - now.timestamp();
        Duration::from_secs(u64::try_from(secs).unwrap_or(0))
    }
}

/// Sign a fresh token issued now.
#[instrument(skip_all)]
pub fn sign_token(
    template: &ClaimSettings,
    secret: &SecretString,
    validity: Duration,
) -> Result<String, RotatorError> {
    sign_token_at(template, secret, validity, Utc::now())
}

/// Sign a token as if issued at `now`.
pub fn sign_token_at(
    template: &ClaimSettings,
    secret: &SecretString,
    validity: Duration,
    now: DateTime<Utc>,
) -> Result<String, RotatorError> {
    let secret_bytes = secret.expose_secret().as_bytes();
    if secret_bytes.is_empty() {
        return Err(RotatorError::SigningConfiguration(
            "signing secret is empty".to_string(),
        ));
    }

    let claims = TokenClaims::issue(template, validity, now);
    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".to_string());

    encode(&header, &claims, &EncodingKey::from_secret(secret_bytes))
        .map_err(|e| RotatorError::SigningConfiguration(format!("JWT signing failed: {e}")))
}

/// Verify the signature of a stored token and return its claims.
///
/// Expiry and audience are reported, not enforced, so callers printing or
/// logging token details never fail on an old token. Malformed tokens and
/// signature mismatches return [`RotatorError::InvalidToken`].
#[instrument(skip_all)]
pub fn inspect_token(token: &str, secret: &SecretString) -> Result<TokenInspection, RotatorError> {
    if token.is_empty() || token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "rotator.crypto",
            token_size = token.len(),
            "Token rejected before decoding"
        );
        return Err(RotatorError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string()));
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let decoding_key = DecodingKey::from_secret(secret.expose_secret().as_bytes());
    let data = decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "rotator.crypto", error = %e, "Token inspection failed");
        RotatorError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
    })?;

    let expired = data.claims.exp <= Utc::now().timestamp();
    Ok(TokenInspection {
        claims: data.claims,
        expired,
    })
}

/// Fail fast on a secret that cannot sign.
pub fn validate_signing_secret(
    template: &ClaimSettings,
    secret: &SecretString,
) -> Result<(), RotatorError> {
    let token = sign_token(template, secret, Duration::from_secs(1))?;
    inspect_token(&token, secret).map(|_| ())
}
