//! Token Rotator Library
//!
//! Keeps one short-lived signed token per slot fresh in MySQL so dependent
//! services can read a valid token without signing their own, and serves a
//! small health surface while doing so.
//!
//! # Architecture
//!
//! ```text
//! services/orchestrator.rs -> services/{startup_probe,rotation_service}.rs
//!                          -> tasks/rotation_scheduler.rs
//!                          -> routes/mod.rs -> handlers/health.rs
//! all storage I/O          -> repositories::TokenStore
//! ```
//!
//! # Modules
//!
//! - `config` - Immutable configuration from environment
//! - `crypto` - Token signing and inspection
//! - `errors` - Error taxonomy
//! - `handlers` - `/health` and `/status`
//! - `models` - Stored record and response bodies
//! - `observability` - Tracing and metrics
//! - `repositories` - `TokenStore` and its MySQL implementation
//! - `routes` - Axum router setup
//! - `services` - Startup probe, rotation, lifecycle
//! - `tasks` - Rotation scheduler

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;
