//! Shared test utilities for gavel-server integration tests

pub mod sse;

use std::net::SocketAddr;
use std::sync::Arc;

use gavel_server::{AppState, GavelServer, ServerConfig};
use tokio::net::TcpListener;

/// Creates a test server with default state, returns state and address
#[allow(dead_code)]
pub async fn create_test_server() -> (Arc<AppState>, SocketAddr) {
    create_test_server_with_state(Arc::new(AppState::new())).await
}

/// Creates a test server around pre-built state (custom broker tuning)
#[allow(dead_code)]
pub async fn create_test_server_with_state(state: Arc<AppState>) -> (Arc<AppState>, SocketAddr) {
    let server = GavelServer::with_state(ServerConfig::default(), Arc::clone(&state));
    let addr = spawn_server(server).await;
    (state, addr)
}

/// Spawns server in background task, returns bound address
async fn spawn_server(server: GavelServer) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run_with_listener(listener).await;
    });

    // Brief delay to ensure server is accepting connections
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    addr
}
