//! Token Rotator
//!
//! Entry point: waits for MySQL, ensures the token record, rotates the token
//! on a fixed interval and serves `/health` and `/status` until SIGINT or
//! SIGTERM.

use std::sync::Arc;
use token_rotator::config::Config;
use token_rotator::crypto;
use token_rotator::observability::{init_tracing, metrics::init_metrics_exporter};
use token_rotator::repositories::{MySqlTokenStore, TokenStore};
use token_rotator::services::Orchestrator;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting token rotator");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        service = %config.service_name,
        mysql_host = %config.database.host,
        mysql_port = config.database.port,
        database = %config.database.database,
        table = %config.database.table,
        slot = %config.slot_name,
        rotation_interval_seconds = config.rotation_interval.as_secs(),
        token_validity_seconds = config.token_validity.as_secs(),
        health_bind_address = %config.health_bind_address,
        "Configuration loaded successfully"
    );

    if let Some(addr) = config.metrics_bind_address {
        init_metrics_exporter(addr).map_err(|e| {
            error!("Failed to start metrics exporter: {}", e);
            e
        })?;
        info!(metrics_bind_address = %addr, "Prometheus metrics exporter started");
    }

    // A secret that cannot sign is fatal before anything touches storage.
    crypto::validate_signing_secret(&config.claims, &config.signing_secret).map_err(|e| {
        error!("Signing configuration rejected: {}", e);
        e
    })?;

    let store = MySqlTokenStore::new(config.database.clone());
    info!(transport = ?store.transport_security(), "Storage transport policy");

    let store: Arc<dyn TokenStore> = Arc::new(store);
    let running = Orchestrator::new(store, Arc::new(config))
        .start()
        .await
        .map_err(|e| {
            error!(state = ?e.state(), "Startup failed: {}", e);
            e
        })?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let state = running.run_until(shutdown).await;
    info!(state = ?state, "Token rotator shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, shutting down"),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
