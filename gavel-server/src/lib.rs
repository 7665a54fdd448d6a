//! gavel-server - HTTP server for the live auction event layer
//!
//! Serves long-lived `text/event-stream` responses for auction, wallet, and
//! featured feeds, plus the featured-feed snapshot endpoint used for client
//! hydration on first paint. The broker and replay buffer live in [`AppState`]
//! and are shared with the in-process publish call sites (the on-chain
//! indexer); no endpoint accepts publishes from untrusted clients.

mod error;
pub mod http;
pub mod sse;
mod state;

use std::sync::Arc;

use tokio::net::TcpListener;

pub use error::ServerError;
pub use http::create_router;
pub use state::AppState;

/// The main gavel server
pub struct GavelServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl GavelServer {
    /// Create a new server with default state
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            state: Arc::new(AppState::new()),
        }
    }

    /// Create a server with custom state (tuned components, testing)
    pub fn with_state(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Run the server, binding to the configured address
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        tracing::info!("gavel server listening on {}", addr);
        self.run_with_listener(listener).await
    }

    /// Run the server on an already-bound listener (ephemeral ports in tests)
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        let router = create_router(self.state);
        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7810,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the socket address string (e.g., "0.0.0.0:7810")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
