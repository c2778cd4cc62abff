//! HTTP routes for the health listener.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::repositories::TokenStore;
use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
///
/// Holds only a read capability against storage; rotation state is never
/// shared with the handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TokenStore>,
    pub config: Arc<Config>,
}

/// Build the application routes.
///
/// - `GET /health` - liveness (database ping)
/// - `GET /status` - token presence and last update
/// - anything else - empty 404
pub fn build_routes(state: Arc<AppState>) -> Router {
    // Requests never outlive the storage timeout by much.
    let request_timeout = state.config.health_check_timeout + Duration::from_secs(5);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::status_check))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}
