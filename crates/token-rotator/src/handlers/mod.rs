//! HTTP handlers for the token rotator.

pub mod health;

pub use health::{health_check, not_found, status_check};
