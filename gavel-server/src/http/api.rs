//! REST API handlers

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the server
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
    /// Open sinks across all live topics
    pub live_subscribers: usize,
    /// Entries currently held by the featured replay buffer
    pub featured_buffered: usize,
}

/// Health check endpoint
///
/// Returns server status, version, uptime, and live subscriber counts.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        live_subscribers: state.broker.total_subscribers(),
        featured_buffered: state.featured.len(),
    })
}
