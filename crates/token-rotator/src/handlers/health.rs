//! Health and status handlers.
//!
//! Both answer from storage on every request and never touch rotation
//! state. Storage failures become 503 bodies carrying the error text.

use crate::errors::RotatorError;
use crate::models::{FailureReport, HealthReport, StatusReport};
use crate::observability::metrics::record_health_request;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::{instrument, warn};

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Bound a storage call by the health check timeout, so a stalled server
/// yields a 503 body instead of the listener's request timeout.
async fn within_health_timeout<T>(
    state: &AppState,
    call: impl Future<Output = Result<T, RotatorError>>,
) -> Result<T, RotatorError> {
    let timeout = state.config.health_check_timeout;
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(RotatorError::Connectivity(format!(
            "no answer within {}s",
            timeout.as_secs()
        ))),
    }
}

fn failure(state: &AppState, status: &str, error: String) -> Response {
    let body = FailureReport {
        status: status.to_string(),
        timestamp: now_rfc3339(),
        service: state.config.service_name.clone(),
        error,
    };
    (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
}

/// Liveness handler.
///
/// Opens and closes a connection to the token database.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "timestamp": "2025-01-01T12:00:00.000000+00:00",
///   "service": "jwt-mysql-automation",
///   "database": "connected"
/// }
/// ```
#[instrument(skip_all, name = "rotator.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let ping = state.store.ping_database(state.config.health_check_timeout);
    match within_health_timeout(&state, ping).await {
        Ok(()) => {
            record_health_request("/health", 200);
            let body = HealthReport {
                status: "healthy".to_string(),
                timestamp: now_rfc3339(),
                service: state.config.service_name.clone(),
                database: "connected".to_string(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            warn!(target: "rotator.health", error = %e, "Health check failed");
            record_health_request("/health", 503);
            failure(&state, "unhealthy", e.to_string())
        }
    }
}

/// Status handler.
///
/// Reports whether the slot has a record and when it was last written.
/// The token itself is never returned.
#[instrument(skip_all, name = "rotator.health.status")]
pub async fn status_check(State(state): State<Arc<AppState>>) -> Response {
    let read = state.store.read(&state.config.slot_name);
    match within_health_timeout(&state, read).await {
        Ok(record) => {
            record_health_request("/status", 200);
            let body = StatusReport {
                status: "operational".to_string(),
                timestamp: now_rfc3339(),
                service: state.config.service_name.clone(),
                database: "connected".to_string(),
                token_exists: record.is_some(),
                last_update: record
                    .and_then(|r| r.updated_at)
                    .map(|t| t.to_rfc3339()),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            warn!(target: "rotator.health", error = %e, "Status check failed");
            record_health_request("/status", 503);
            failure(&state, "error", e.to_string())
        }
    }
}

/// Unknown paths: 404 with an empty body.
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
