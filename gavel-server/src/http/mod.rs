//! HTTP server module

mod api;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;

use crate::AppState;
use crate::sse;

pub use api::HealthResponse;

/// Create the HTTP router with all routes configured.
///
/// Browser clients connect to the `/live/*` streams cross-origin, so CORS is
/// permissive; all routes are read-only.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/live/auctions/:auction_id", get(sse::auction_stream))
        .route("/live/wallets/:address", get(sse::wallet_stream))
        .route("/live/featured", get(sse::featured_stream))
        .route("/live/featured/snapshot", get(sse::featured_snapshot))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
