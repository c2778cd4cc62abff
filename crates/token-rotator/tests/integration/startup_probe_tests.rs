//! Startup probe tests.
//!
//! Run on paused time, so elapsed time counts exactly the sleeps taken.

use rotator_test_utils::InMemoryTokenStore;
use std::time::Duration;
use token_rotator::services::{wait_until_ready, ProbePolicy};
use tokio::time::Instant;

fn policy(max_attempts: u32) -> ProbePolicy {
    ProbePolicy {
        max_attempts,
        delay: Duration::from_secs(2),
        connect_timeout: Duration::from_secs(10),
    }
}

/// A reachable store is ready on the first attempt without sleeping.
#[tokio::test(start_paused = true)]
async fn test_ready_on_first_attempt() {
    let store = InMemoryTokenStore::new();
    let start = Instant::now();

    assert!(wait_until_ready(&store, policy(30)).await);

    assert_eq!(store.ping_server_calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

/// Reachable from attempt K on: K attempts and exactly K-1 delays.
#[tokio::test(start_paused = true)]
async fn test_ready_after_k_attempts_sleeps_k_minus_one_delays() {
    for k in [2u32, 4, 10] {
        let store = InMemoryTokenStore::new().unreachable_for(k - 1);
        let start = Instant::now();

        assert!(wait_until_ready(&store, policy(10)).await, "k = {k}");

        assert_eq!(store.ping_server_calls(), k);
        assert_eq!(start.elapsed(), Duration::from_secs(2) * (k - 1));
    }
}

/// A store that never answers is given up on after exactly max_attempts.
#[tokio::test(start_paused = true)]
async fn test_never_reachable_gives_up_after_max_attempts() {
    let store = InMemoryTokenStore::new().never_reachable();
    let start = Instant::now();

    assert!(!wait_until_ready(&store, policy(3)).await);

    assert_eq!(store.ping_server_calls(), 3);
    // No sleep after the final attempt.
    assert_eq!(start.elapsed(), Duration::from_secs(4));
}

/// Policy is taken from configuration.
#[test]
fn test_policy_from_config() {
    let config = rotator_test_utils::test_config_with(&[
        ("STARTUP_MAX_ATTEMPTS", "7"),
        ("STARTUP_RETRY_DELAY_SECONDS", "5"),
        ("DB_CONNECT_TIMEOUT_SECONDS", "3"),
    ]);

    assert_eq!(
        ProbePolicy::from_config(&config),
        ProbePolicy {
            max_attempts: 7,
            delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(3),
        }
    );
}
