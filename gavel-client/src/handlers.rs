//! Caller-supplied handlers for the bid-lifecycle protocol
//!
//! One optional callback per event name. Dispatch parses payloads
//! defensively (a malformed payload drops the event rather than raising into
//! application code), applies the settlement/cancellation normalization, and
//! isolates handler panics so one callback cannot break delivery of later
//! events.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use gavel_core::{
    AuctionClose, AuctionEvent, AuctionExtension, AuctionStatus, BidFailure, BidTx,
};
use serde_json::Value;
use tracing::{debug, warn};

type Handler<T> = Box<dyn Fn(T) + Send + Sync>;

/// Handler table for one live feed. Register callbacks builder-style; any
/// event without a handler is silently ignored.
#[derive(Default)]
pub struct BidEventHandlers {
    on_ready: Option<Handler<()>>,
    on_bid_pending: Option<Handler<BidTx>>,
    on_bid_confirmed: Option<Handler<BidTx>>,
    on_bid_failed: Option<Handler<BidFailure>>,
    on_auction_extended: Option<Handler<AuctionExtension>>,
    on_auction_settled: Option<Handler<AuctionClose>>,
    on_auction_cancelled: Option<Handler<AuctionClose>>,
    on_unknown: Option<Handler<(String, Value)>>,
}

impl BidEventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_ready(mut self, f: impl Fn(()) + Send + Sync + 'static) -> Self {
        self.on_ready = Some(Box::new(f));
        self
    }

    pub fn on_bid_pending(mut self, f: impl Fn(BidTx) + Send + Sync + 'static) -> Self {
        self.on_bid_pending = Some(Box::new(f));
        self
    }

    pub fn on_bid_confirmed(mut self, f: impl Fn(BidTx) + Send + Sync + 'static) -> Self {
        self.on_bid_confirmed = Some(Box::new(f));
        self
    }

    pub fn on_bid_failed(mut self, f: impl Fn(BidFailure) + Send + Sync + 'static) -> Self {
        self.on_bid_failed = Some(Box::new(f));
        self
    }

    pub fn on_auction_extended(
        mut self,
        f: impl Fn(AuctionExtension) + Send + Sync + 'static,
    ) -> Self {
        self.on_auction_extended = Some(Box::new(f));
        self
    }

    pub fn on_auction_settled(
        mut self,
        f: impl Fn(AuctionClose) + Send + Sync + 'static,
    ) -> Self {
        self.on_auction_settled = Some(Box::new(f));
        self
    }

    pub fn on_auction_cancelled(
        mut self,
        f: impl Fn(AuctionClose) + Send + Sync + 'static,
    ) -> Self {
        self.on_auction_cancelled = Some(Box::new(f));
        self
    }

    /// Called for event names outside the closed set, with the raw payload
    pub fn on_unknown(mut self, f: impl Fn((String, Value)) + Send + Sync + 'static) -> Self {
        self.on_unknown = Some(Box::new(f));
        self
    }

    /// Decode a wire frame and dispatch it. Malformed payloads are dropped.
    pub(crate) fn dispatch_wire(&self, name: &str, data: &str) {
        match AuctionEvent::from_wire(name, data) {
            Ok(event) => self.dispatch(event),
            Err(e) => debug!(event = name, "Dropping malformed payload: {}", e),
        }
    }

    /// Dispatch a decoded event to its handler, normalizing settlement and
    /// cancellation payloads so consumers always see both `price` and
    /// `amount` plus a populated `status`.
    pub(crate) fn dispatch(&self, event: AuctionEvent) {
        match event {
            AuctionEvent::Ready => invoke(&self.on_ready, ()),
            AuctionEvent::BidPending(tx) => invoke(&self.on_bid_pending, tx),
            AuctionEvent::BidConfirmed(tx) => invoke(&self.on_bid_confirmed, tx),
            AuctionEvent::BidFailed(failure) => invoke(&self.on_bid_failed, failure),
            AuctionEvent::AuctionExtended(ext) => invoke(&self.on_auction_extended, ext),
            AuctionEvent::AuctionSettled(close) => invoke(
                &self.on_auction_settled,
                close.normalized(AuctionStatus::Ended),
            ),
            AuctionEvent::AuctionCancelled(close) => invoke(
                &self.on_auction_cancelled,
                close.normalized(AuctionStatus::Cancelled),
            ),
            AuctionEvent::Unknown { name, payload } => invoke(&self.on_unknown, (name, payload)),
        }
    }
}

fn invoke<T>(handler: &Option<Handler<T>>, payload: T) {
    if let Some(handler) = handler
        && panic::catch_unwind(AssertUnwindSafe(|| handler(payload))).is_err()
    {
        warn!("Event handler panicked");
    }
}

impl fmt::Debug for BidEventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BidEventHandlers")
            .field("on_ready", &self.on_ready.is_some())
            .field("on_bid_pending", &self.on_bid_pending.is_some())
            .field("on_bid_confirmed", &self.on_bid_confirmed.is_some())
            .field("on_bid_failed", &self.on_bid_failed.is_some())
            .field("on_auction_extended", &self.on_auction_extended.is_some())
            .field("on_auction_settled", &self.on_auction_settled.is_some())
            .field("on_auction_cancelled", &self.on_auction_cancelled.is_some())
            .field("on_unknown", &self.on_unknown.is_some())
            .finish()
    }
}
