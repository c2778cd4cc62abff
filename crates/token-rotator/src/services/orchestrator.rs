//! Service lifecycle.
//!
//! ```text
//! Booting ──probe fails──> ProbeFailed
//!    │
//!    └─probe ok, schema ensured──> SchemaReady ──first rotation──> Running ──shutdown──> Stopped
//! ```
//!
//! Schema initialization strictly precedes the first rotation and the health
//! listener, so status queries never observe a slot without its record.

use crate::config::Config;
use crate::errors::RotatorError;
use crate::repositories::{RecordInit, TokenStore};
use crate::routes::{self, AppState};
use crate::services::rotation_service::TokenRotator;
use crate::services::startup_probe::{wait_until_ready, ProbePolicy};
use crate::tasks::run_rotation_scheduler;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Booting,
    /// Terminal: storage never became reachable.
    ProbeFailed,
    SchemaReady,
    Running,
    Stopped,
}

/// Reasons [`Orchestrator::start`] does not reach `Running`.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Storage was not reachable after {attempts} attempts")]
    ProbeFailed { attempts: u32 },

    #[error("Schema initialization failed: {0}")]
    Schema(#[source] RotatorError),

    #[error("Failed to bind health listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

impl StartupError {
    /// The lifecycle state the failure leaves the service in.
    pub fn state(&self) -> LifecycleState {
        match self {
            StartupError::ProbeFailed { .. } => LifecycleState::ProbeFailed,
            StartupError::Schema(_) => LifecycleState::Booting,
            StartupError::Bind { .. } => LifecycleState::SchemaReady,
        }
    }
}

pub struct Orchestrator {
    store: Arc<dyn TokenStore>,
    config: Arc<Config>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn TokenStore>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    /// Probe, ensure the schema, rotate once and start the health listener.
    pub async fn start(self) -> Result<RunningService, StartupError> {
        let mut state = LifecycleState::Booting;
        info!(target: "rotator.lifecycle", state = ?state, "Starting token rotator");

        let policy = ProbePolicy::from_config(&self.config);
        if !wait_until_ready(self.store.as_ref(), policy).await {
            error!(
                target: "rotator.lifecycle",
                state = ?LifecycleState::ProbeFailed,
                "Startup aborted: storage unreachable"
            );
            return Err(StartupError::ProbeFailed {
                attempts: policy.max_attempts,
            });
        }

        let init = self
            .store
            .ensure_schema(&self.config.slot_name)
            .await
            .map_err(StartupError::Schema)?;
        state = LifecycleState::SchemaReady;
        info!(
            target: "rotator.lifecycle",
            state = ?state,
            record_created = init == RecordInit::Created,
            slot = %self.config.slot_name,
            "Schema ready"
        );

        let rotator = TokenRotator::new(Arc::clone(&self.store), Arc::clone(&self.config));
        match rotator.rotate_once().await {
            Ok(outcome) => {
                info!(target: "rotator.lifecycle", outcome = ?outcome, "Initial rotation complete");
            }
            Err(e) => {
                // The scheduler retries on its own cadence.
                warn!(
                    target: "rotator.lifecycle",
                    error = %e,
                    connectivity = e.is_connectivity(),
                    "Initial rotation failed"
                );
            }
        }

        let addr = self.config.health_bind_address;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| StartupError::Bind { addr, source })?;
        let health_addr = listener
            .local_addr()
            .map_err(|source| StartupError::Bind { addr, source })?;

        let app_state = Arc::new(AppState {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        });
        let app = routes::build_routes(app_state);

        let health_task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(target: "rotator.health", error = %e, "Health server failed");
            }
        });

        state = LifecycleState::Running;
        info!(
            target: "rotator.lifecycle",
            state = ?state,
            health_addr = %health_addr,
            interval_seconds = self.config.rotation_interval.as_secs(),
            "Token rotator running"
        );

        Ok(RunningService {
            rotator,
            config: self.config,
            health_addr,
            health_task,
        })
    }
}

/// A started service: health listener up, scheduler not yet driving.
pub struct RunningService {
    rotator: TokenRotator,
    config: Arc<Config>,
    health_addr: SocketAddr,
    health_task: JoinHandle<()>,
}

impl RunningService {
    /// Address the health listener actually bound (resolves port 0).
    pub fn health_addr(&self) -> SocketAddr {
        self.health_addr
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::Running
    }

    /// Drive the rotation scheduler on the calling task until `shutdown`
    /// fires, then abandon the health listener.
    pub async fn run_until(self, shutdown: CancellationToken) -> LifecycleState {
        let rotator = self.rotator;
        run_rotation_scheduler(self.config.rotation_interval, shutdown, move || {
            let rotator = rotator.clone();
            async move { rotator.rotate_once().await.map(|_| ()) }
        })
        .await;

        self.health_task.abort();
        info!(
            target: "rotator.lifecycle",
            state = ?LifecycleState::Stopped,
            "Token rotator stopped"
        );
        LifecycleState::Stopped
    }
}
