//! # Rotator Test Utilities
//!
//! Shared test utilities for the token rotator.
//!
//! ## Modules
//!
//! - `memory_store` - In-memory `TokenStore` with scripted outages
//! - `fixtures` - Test configuration
//! - `server_harness` - Health routes on a random local port

pub mod fixtures;
pub mod memory_store;
pub mod server_harness;

pub use fixtures::*;
pub use memory_store::InMemoryTokenStore;
pub use server_harness::TestRotatorServer;
