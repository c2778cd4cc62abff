//! Background tasks for the token rotator.
//!
//! - Rotation scheduler: fires a rotation once per interval without overlap

pub mod rotation_scheduler;

pub use rotation_scheduler::run_rotation_scheduler;
