//! Durable storage for the rotated token.
//!
//! [`TokenStore`] is the only path to storage. The MySQL implementation lives
//! in [`token_records`]; tests substitute an in-memory store.

pub mod token_records;

use crate::errors::RotatorError;
use crate::models::TokenRecord;
use std::time::Duration;

pub use token_records::{MySqlTokenStore, TransportSecurity};

/// Whether `ensure_schema` had to create the slot's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordInit {
    Created,
    AlreadyPresent,
}

/// Storage operations for the single-record-per-slot token table.
///
/// Every call acquires its own connection and releases it before returning,
/// on success and failure alike. Implementations never retry.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Open and immediately close a connection to the storage server,
    /// without selecting the database (it may not exist yet).
    async fn ping_server(&self, timeout: Duration) -> Result<(), RotatorError>;

    /// Open and immediately close a connection to the token database.
    async fn ping_database(&self, timeout: Duration) -> Result<(), RotatorError>;

    /// Create the database, table and the slot's empty record if absent.
    /// Idempotent; safe on every start.
    async fn ensure_schema(&self, slot: &str) -> Result<RecordInit, RotatorError>;

    /// Replace the slot's token. The storage clock stamps `updated_at`.
    ///
    /// Returns [`RotatorError::RecordMissing`] when no record matches.
    async fn upsert(&self, slot: &str, token: &str) -> Result<(), RotatorError>;

    /// Point lookup. `Ok(None)` when the slot has no record.
    async fn read(&self, slot: &str) -> Result<Option<TokenRecord>, RotatorError>;
}
