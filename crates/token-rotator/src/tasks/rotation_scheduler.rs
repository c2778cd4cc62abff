//! Rotation scheduler.
//!
//! Fires the rotation callback once per interval. The first tick is one
//! interval after start: the orchestrator performs the initial rotation
//! itself before handing control to this loop.
//!
//! # Overlap
//!
//! The callback is awaited inline, so a second invocation can never start
//! while one is running. Ticks that come due during a slow rotation are
//! skipped (`MissedTickBehavior::Skip`) rather than fired back-to-back.
//!
//! # Graceful Shutdown
//!
//! Cancellation is observed while waiting for the next tick. An in-flight
//! rotation runs to completion (or its storage timeout) before the loop
//! notices the token.

use crate::errors::RotatorError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

/// Run the rotation loop until `cancel_token` is cancelled.
///
/// Returns the number of ticks that invoked the callback. Callback errors
/// are logged and never end the loop.
#[instrument(skip_all, name = "rotator.task.scheduler")]
pub async fn run_rotation_scheduler<F, Fut>(
    interval: Duration,
    cancel_token: CancellationToken,
    mut rotate: F,
) -> u64
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<(), RotatorError>> + Send,
{
    info!(
        target: "rotator.task.scheduler",
        interval_seconds = interval.as_secs(),
        "Starting rotation scheduler"
    );

    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                info!(
                    target: "rotator.task.scheduler",
                    "Rotation scheduler received shutdown signal, exiting"
                );
                break;
            }
            _ = ticker.tick() => {
                ticks += 1;
                if let Err(e) = rotate().await {
                    // Keep firing: the next tick is the retry.
                    error!(
                        target: "rotator.task.scheduler",
                        tick = ticks,
                        error = %e,
                        "Scheduled rotation failed"
                    );
                }
            }
        }
    }

    info!(
        target: "rotator.task.scheduler",
        ticks = ticks,
        "Rotation scheduler stopped"
    );
    ticks
}
