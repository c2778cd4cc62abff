//! Token lifecycle services.
//!
//! - `startup_probe`: bounded connectivity retry before readiness
//! - `rotation_service`: sign and persist one token
//! - `orchestrator`: probe, schema, first rotation, then steady state

pub mod orchestrator;
pub mod rotation_service;
pub mod startup_probe;

pub use orchestrator::{LifecycleState, Orchestrator, RunningService, StartupError};
pub use rotation_service::{RotationOutcome, TokenRotator};
pub use startup_probe::{wait_until_ready, ProbePolicy};
