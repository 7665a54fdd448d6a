//! SSE handlers for auction and wallet rooms

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use futures::{Stream, StreamExt};
use gavel_core::{Subscription, Topic};
use tracing::debug;

use super::frame_to_sse;
use crate::AppState;

/// SSE stream of one auction's bid-lifecycle events
pub async fn auction_stream(
    State(state): State<Arc<AppState>>,
    Path(auction_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let topic = Topic::auction(auction_id);
    debug!(topic = %topic, "Live room connection opened");
    sse_response(state.broker.subscribe(&topic))
}

/// SSE stream of one wallet's bid-lifecycle events.
///
/// The address is case-folded by the topic builder, so two clients naming the
/// same wallet in different casing land on the same topic.
pub async fn wallet_stream(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let topic = Topic::wallet(address);
    debug!(topic = %topic, "Live room connection opened");
    sse_response(state.broker.subscribe(&topic))
}

/// Dropping the response stream (client disconnect) drops the subscription,
/// which detaches the sink from its topic set.
fn sse_response(
    subscription: Subscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(subscription.map(frame_to_sse))
}
