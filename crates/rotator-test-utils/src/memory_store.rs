//! In-memory `TokenStore` for lifecycle and handler tests.
//!
//! Behaves like the MySQL store (one record per slot, storage-stamped
//! `updated_at`, `RecordMissing` on a zero-row update) and adds knobs for
//! outages and slow writes.
//!
//! # Example
//!
//! ```rust,ignore
//! use rotator_test_utils::InMemoryTokenStore;
//!
//! // Reachable from the third probe attempt on.
//! let store = InMemoryTokenStore::new().unreachable_for(2);
//! assert!(wait_until_ready(&store, policy).await);
//! assert_eq!(store.ping_server_calls(), 3);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use token_rotator::errors::RotatorError;
use token_rotator::models::TokenRecord;
use token_rotator::repositories::{RecordInit, TokenStore};

#[derive(Debug, Clone)]
pub struct InMemoryTokenStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, (String, Option<DateTime<Utc>>)>,
    /// `ping_server` fails this many more times.
    unreachable_pings: u32,
    never_reachable: bool,
    /// Every post-readiness operation fails with a connectivity error.
    database_down: bool,
    upsert_delay: Option<Duration>,
    /// Health-path calls (`ping_database`, `read`) hang this long first.
    query_stall: Option<Duration>,
    /// Fail this many more writes with a connectivity error.
    failing_upserts: u32,
    ping_server_calls: u32,
    ping_database_calls: u32,
    ensure_schema_calls: u32,
    upsert_calls: u32,
    read_calls: u32,
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTokenStore {
    /// Empty, always reachable store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Fail the first `attempts` server pings.
    #[must_use]
    pub fn unreachable_for(self, attempts: u32) -> Self {
        self.lock().unreachable_pings = attempts;
        self
    }

    /// Fail every server ping.
    #[must_use]
    pub fn never_reachable(self) -> Self {
        self.lock().never_reachable = true;
        self
    }

    /// Hold each write this long before applying it.
    #[must_use]
    pub fn with_upsert_delay(self, delay: Duration) -> Self {
        self.lock().upsert_delay = Some(delay);
        self
    }

    /// Fail the next `count` writes as if the connection dropped.
    #[must_use]
    pub fn failing_upserts(self, count: u32) -> Self {
        self.lock().failing_upserts = count;
        self
    }

    /// Seed a record as if written at `updated_at`.
    #[must_use]
    pub fn with_record(self, slot: &str, token: &str, updated_at: DateTime<Utc>) -> Self {
        self.lock()
            .records
            .insert(slot.to_string(), (token.to_string(), Some(updated_at)));
        self
    }

    /// Simulate a database outage after startup.
    pub fn set_database_down(&self, down: bool) {
        self.lock().database_down = down;
    }

    /// Hang health-path calls for `delay`, like a server that accepted the
    /// connection and stopped answering.
    pub fn stall_queries(&self, delay: Duration) {
        self.lock().query_stall = Some(delay);
    }

    /// Delete a slot's record behind the service's back.
    pub fn remove_record(&self, slot: &str) {
        self.lock().records.remove(slot);
    }

    pub fn record(&self, slot: &str) -> Option<TokenRecord> {
        self.lock().records.get(slot).map(|(token, updated_at)| TokenRecord {
            slot_name: slot.to_string(),
            token_value: token.clone(),
            updated_at: *updated_at,
        })
    }

    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }

    pub fn ping_server_calls(&self) -> u32 {
        self.lock().ping_server_calls
    }

    pub fn ping_database_calls(&self) -> u32 {
        self.lock().ping_database_calls
    }

    pub fn ensure_schema_calls(&self) -> u32 {
        self.lock().ensure_schema_calls
    }

    pub fn upsert_calls(&self) -> u32 {
        self.lock().upsert_calls
    }

    pub fn read_calls(&self) -> u32 {
        self.lock().read_calls
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    async fn stall(&self) {
        let stall = self.lock().query_stall;
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
    }
}

fn outage() -> RotatorError {
    RotatorError::Connectivity("Can't connect to MySQL server (connection refused)".to_string())
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn ping_server(&self, _timeout: Duration) -> Result<(), RotatorError> {
        let mut inner = self.lock();
        inner.ping_server_calls += 1;
        if inner.never_reachable {
            return Err(outage());
        }
        if inner.unreachable_pings > 0 {
            inner.unreachable_pings -= 1;
            return Err(outage());
        }
        Ok(())
    }

    async fn ping_database(&self, _timeout: Duration) -> Result<(), RotatorError> {
        self.stall().await;
        let mut inner = self.lock();
        inner.ping_database_calls += 1;
        if inner.database_down {
            return Err(outage());
        }
        Ok(())
    }

    async fn ensure_schema(&self, slot: &str) -> Result<RecordInit, RotatorError> {
        let mut inner = self.lock();
        inner.ensure_schema_calls += 1;
        if inner.database_down {
            return Err(outage());
        }
        if inner.records.contains_key(slot) {
            return Ok(RecordInit::AlreadyPresent);
        }
        inner
            .records
            .insert(slot.to_string(), (String::new(), Some(Utc::now())));
        Ok(RecordInit::Created)
    }

    async fn upsert(&self, slot: &str, token: &str) -> Result<(), RotatorError> {
        let delay = {
            let mut inner = self.lock();
            inner.upsert_calls += 1;
            if inner.database_down {
                return Err(outage());
            }
            if inner.failing_upserts > 0 {
                inner.failing_upserts -= 1;
                return Err(outage());
            }
            inner.upsert_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        // Single write under the lock: readers see before or after, never between.
        let mut inner = self.lock();
        match inner.records.get_mut(slot) {
            Some(record) => {
                *record = (token.to_string(), Some(Utc::now()));
                Ok(())
            }
            None => Err(RotatorError::RecordMissing {
                slot: slot.to_string(),
            }),
        }
    }

    async fn read(&self, slot: &str) -> Result<Option<TokenRecord>, RotatorError> {
        self.stall().await;
        let mut inner = self.lock();
        inner.read_calls += 1;
        if inner.database_down {
            return Err(outage());
        }
        Ok(inner
            .records
            .get(slot)
            .map(|(token, updated_at)| TokenRecord {
                slot_name: slot.to_string(),
                token_value: token.clone(),
                updated_at: *updated_at,
            }))
    }
}
