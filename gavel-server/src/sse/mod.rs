//! SSE endpoints for the live feeds
//!
//! Each stream opens with `event: ready` / `data: {"ok":true}`, then carries
//! named events as `event: <name>\ndata: <json>\n\n` frames with periodic
//! `: ping <epoch-ms>` comments as keep-alive.

mod featured;
mod rooms;

pub use featured::{SnapshotQuery, featured_snapshot, featured_stream};
pub use rooms::{auction_stream, wallet_stream};

use std::convert::Infallible;

use axum::response::sse::Event;
use gavel_core::Frame;

/// Map a broker frame onto the wire: `event:`/`data:` lines for events, a
/// bare comment line for keep-alives.
fn frame_to_sse(frame: Frame) -> Result<Event, Infallible> {
    Ok(match frame {
        Frame::Event { name, data } => Event::default().event(name).data(data),
        Frame::Comment(text) => Event::default().comment(text),
    })
}
