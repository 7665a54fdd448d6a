//! Featured feed: live SSE bridge and snapshot endpoint
//!
//! The replay buffer stays decoupled from the topic broker; each live
//! connection bridges a buffer listener into its own bounded channel.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use chrono::Utc;
use futures::{Stream, StreamExt};
use gavel_core::{FEATURED_BUFFER_MAX, FeaturedEvent, Frame, ListenerGuard};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::frame_to_sse;
use crate::AppState;

/// Frames buffered per featured-feed connection before frames are dropped
const FEATURED_QUEUE_CAPACITY: usize = 256;
/// Interval between keep-alive comments on featured streams
const FEATURED_KEEP_ALIVE: Duration = Duration::from_secs(25);
/// Wire event name for live featured-feed frames
const FEATURED_EVENT_NAME: &str = "featured_bid";

/// Query parameters for the snapshot endpoint
#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    /// Maximum entries to return; negative values clamp to zero and the
    /// buffer clamps the upper bound to its capacity
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Point-in-time view of the featured feed, newest first.
///
/// Used by clients to hydrate state that predates their live connection.
pub async fn featured_snapshot(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SnapshotQuery>,
) -> Json<Vec<FeaturedEvent>> {
    let limit = query.limit.unwrap_or(FEATURED_BUFFER_MAX as i64).max(0) as usize;
    Json(state.featured.snapshot(limit))
}

/// Live SSE stream of the featured feed
pub async fn featured_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("Featured feed connection opened");
    let (tx, rx) = mpsc::channel(FEATURED_QUEUE_CAPACITY);

    // Enqueued before the listener registration so `ready` is always first.
    let _ = tx.try_send(Frame::ready());

    let listener_tx = tx.clone();
    let guard = state.featured.add_listener(move |event| {
        match serde_json::to_string(event) {
            Ok(data) => {
                // A full or closed queue means this client is stalled or
                // gone; dropping the frame never disturbs other listeners.
                let _ = listener_tx.try_send(Frame::Event {
                    name: FEATURED_EVENT_NAME.to_string(),
                    data,
                });
            }
            Err(e) => warn!("Failed to serialize featured event: {}", e),
        }
    });

    tokio::spawn(keep_alive(tx));

    let stream = FeaturedStream {
        rx,
        _listener: guard,
    };
    Sse::new(stream.map(frame_to_sse))
}

async fn keep_alive(tx: mpsc::Sender<Frame>) {
    loop {
        tokio::time::sleep(FEATURED_KEEP_ALIVE).await;
        let ping = Frame::Comment(format!("ping {}", Utc::now().timestamp_millis()));
        match tx.try_send(ping) {
            // A full queue already carries traffic
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => break,
        }
    }
}

/// Receiver half of the listener bridge. Dropping it (client disconnect)
/// deregisters the buffer listener via the held guard.
struct FeaturedStream {
    rx: mpsc::Receiver<Frame>,
    _listener: ListenerGuard,
}

impl Stream for FeaturedStream {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use gavel_core::FeaturedKind;

    use super::*;

    fn featured(cycle_id: &str) -> FeaturedEvent {
        FeaturedEvent {
            kind: FeaturedKind::BidPlaced,
            at: 1_700_000_000_000,
            tx_hash: format!("0x{}", cycle_id),
            cycle_id: cycle_id.to_string(),
            bidder: "0xabc".to_string(),
            new_total_wei: "1000".to_string(),
            collection: "apes".to_string(),
            bidder_profile: None,
            collection_meta: None,
        }
    }

    #[tokio::test]
    async fn snapshot_handler_returns_newest_first() {
        let state = Arc::new(AppState::new());
        for id in ["c1", "c2", "c3"] {
            state.push_featured(featured(id));
        }

        let response = featured_snapshot(
            State(Arc::clone(&state)),
            Query(SnapshotQuery { limit: Some(2) }),
        )
        .await;

        let ids: Vec<_> = response.iter().map(|e| e.cycle_id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c2"]);
    }

    #[tokio::test]
    async fn snapshot_handler_clamps_negative_limit() {
        let state = Arc::new(AppState::new());
        state.push_featured(featured("c1"));

        let response = featured_snapshot(
            State(Arc::clone(&state)),
            Query(SnapshotQuery { limit: Some(-5) }),
        )
        .await;
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn snapshot_handler_defaults_to_full_buffer() {
        let state = Arc::new(AppState::new());
        for i in 0..5 {
            state.push_featured(featured(&format!("c{}", i)));
        }

        let response =
            featured_snapshot(State(Arc::clone(&state)), Query(SnapshotQuery { limit: None }))
                .await;
        assert_eq!(response.len(), 5);
    }
}
