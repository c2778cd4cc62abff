//! Bounded startup connectivity probe.
//!
//! The only retrying storage call in the service. Everything after readiness
//! fails fast and waits for the next scheduled tick instead.

use crate::config::Config;
use crate::observability::metrics::record_probe_attempt;
use crate::repositories::TokenStore;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Retry budget for [`wait_until_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub max_attempts: u32,
    /// Sleep between attempts (never after the last one).
    pub delay: Duration,
    /// Timeout of each individual connection attempt.
    pub connect_timeout: Duration,
}

impl ProbePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.startup_max_attempts,
            delay: config.startup_retry_delay,
            connect_timeout: config.database.connect_timeout,
        }
    }
}

/// Ping the storage server until it answers or the attempts run out.
///
/// Returns `true` on the first successful attempt. A store reachable from
/// attempt K on is probed K times with K-1 sleeps in between.
#[instrument(skip_all, name = "rotator.startup.probe", fields(max_attempts = policy.max_attempts))]
pub async fn wait_until_ready(store: &dyn TokenStore, policy: ProbePolicy) -> bool {
    for attempt in 1..=policy.max_attempts {
        match store.ping_server(policy.connect_timeout).await {
            Ok(()) => {
                record_probe_attempt(true);
                info!(
                    target: "rotator.startup",
                    attempt = attempt,
                    "Storage is reachable"
                );
                return true;
            }
            Err(e) => {
                record_probe_attempt(false);
                warn!(
                    target: "rotator.startup",
                    attempt = attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "Storage not reachable yet"
                );
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    error!(
        target: "rotator.startup",
        max_attempts = policy.max_attempts,
        "Storage never became reachable, giving up"
    );
    false
}
