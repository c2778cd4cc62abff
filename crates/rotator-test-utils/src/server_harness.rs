//! Test server harness.
//!
//! Provides `TestRotatorServer` for serving the real health routes over a
//! supplied store.

use crate::fixtures::test_config;
use std::net::SocketAddr;
use std::sync::Arc;
use token_rotator::config::Config;
use token_rotator::repositories::TokenStore;
use token_rotator::routes::{self, AppState};
use tokio::task::JoinHandle;

/// Health listener on a random local port.
///
/// # Example
/// ```rust,ignore
/// let store = Arc::new(InMemoryTokenStore::new());
/// let server = TestRotatorServer::spawn(store).await?;
///
/// let response = reqwest::get(format!("{}/health", server.url())).await?;
/// assert_eq!(response.status(), 200);
/// ```
pub struct TestRotatorServer {
    addr: SocketAddr,
    config: Arc<Config>,
    handle: JoinHandle<()>,
}

impl TestRotatorServer {
    /// Spawn with [`test_config`].
    pub async fn spawn(store: Arc<dyn TokenStore>) -> Result<Self, anyhow::Error> {
        Self::spawn_with_config(store, test_config()).await
    }

    pub async fn spawn_with_config(
        store: Arc<dyn TokenStore>,
        config: Config,
    ) -> Result<Self, anyhow::Error> {
        let config = Arc::new(config);
        let state = Arc::new(AppState {
            store,
            config: Arc::clone(&config),
        });
        let app = routes::build_routes(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;
        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            handle,
        })
    }

    /// Base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestRotatorServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
