//! Event type definitions
//!
//! The closed event-name set consumed on auction and wallet topics, plus the
//! featured-feed payload stored in the replay buffer. Payloads serialize in
//! camelCase to match the marketplace's JSON contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Final status of an auction carried on settlement/cancellation events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuctionStatus {
    Ended,
    Cancelled,
}

/// A bid transaction observed on-chain, pending or confirmed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidTx {
    pub tx_hash: String,
    pub from: String,
    pub auction_id: String,
    /// Bid amount in base units, kept as a string to avoid precision loss
    pub amount: String,
    pub currency_id: String,
    /// Epoch milliseconds
    pub at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

/// A bid transaction that reverted or failed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidFailure {
    pub tx_hash: String,
    pub from: String,
    pub auction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub at: i64,
}

/// Anti-snipe extension of an auction's end time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionExtension {
    pub auction_id: String,
    pub new_end_time_sec: u64,
}

/// Settlement or cancellation of an auction.
///
/// Upstream producers are inconsistent about `price` vs `amount` and may omit
/// `status`; [`AuctionClose::normalized`] gives consumers a uniform shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionClose {
    pub auction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AuctionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<i64>,
}

impl AuctionClose {
    /// Normalize producer field variance: whichever of `price`/`amount` is
    /// present is mirrored into the other, and a missing `status` falls back
    /// to `default_status`.
    pub fn normalized(mut self, default_status: AuctionStatus) -> Self {
        match (&self.price, &self.amount) {
            (Some(price), None) => self.amount = Some(price.clone()),
            (None, Some(amount)) => self.price = Some(amount.clone()),
            _ => {}
        }
        self.status.get_or_insert(default_status);
        self
    }
}

/// Events on the bid-lifecycle feeds (auction and wallet topics)
#[derive(Debug, Clone, PartialEq)]
pub enum AuctionEvent {
    /// Handshake sent once, immediately after subscribe
    Ready,

    /// A bid transaction was submitted, not yet confirmed
    BidPending(BidTx),

    /// Bid transaction confirmed on-chain
    BidConfirmed(BidTx),

    /// Bid transaction reverted or failed
    BidFailed(BidFailure),

    /// Anti-snipe rule pushed the end time back
    AuctionExtended(AuctionExtension),

    /// Auction ended and was finalized
    AuctionSettled(AuctionClose),

    /// Auction was cancelled before settlement
    AuctionCancelled(AuctionClose),

    /// Unrecognized event name, delivered but not interpreted
    Unknown { name: String, payload: Value },
}

impl AuctionEvent {
    /// The wire event name (the `event:` field of an SSE frame)
    pub fn name(&self) -> &str {
        match self {
            Self::Ready => "ready",
            Self::BidPending(_) => "bid_pending",
            Self::BidConfirmed(_) => "bid_confirmed",
            Self::BidFailed(_) => "bid_failed",
            Self::AuctionExtended(_) => "auction_extended",
            Self::AuctionSettled(_) => "auction_settled",
            Self::AuctionCancelled(_) => "auction_cancelled",
            Self::Unknown { name, .. } => name,
        }
    }

    /// Serialize the payload (the `data:` field of an SSE frame).
    pub fn payload_json(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Ready => Ok(r#"{"ok":true}"#.to_string()),
            Self::BidPending(tx) | Self::BidConfirmed(tx) => serde_json::to_string(tx),
            Self::BidFailed(failure) => serde_json::to_string(failure),
            Self::AuctionExtended(ext) => serde_json::to_string(ext),
            Self::AuctionSettled(close) | Self::AuctionCancelled(close) => {
                serde_json::to_string(close)
            }
            Self::Unknown { payload, .. } => serde_json::to_string(payload),
        }
    }

    /// Decode a received frame by event name.
    ///
    /// Names outside the closed set parse into [`AuctionEvent::Unknown`];
    /// malformed JSON for a known name is an error the caller drops.
    pub fn from_wire(name: &str, data: &str) -> Result<Self, serde_json::Error> {
        match name {
            "ready" => Ok(Self::Ready),
            "bid_pending" => Ok(Self::BidPending(serde_json::from_str(data)?)),
            "bid_confirmed" => Ok(Self::BidConfirmed(serde_json::from_str(data)?)),
            "bid_failed" => Ok(Self::BidFailed(serde_json::from_str(data)?)),
            "auction_extended" => Ok(Self::AuctionExtended(serde_json::from_str(data)?)),
            "auction_settled" => Ok(Self::AuctionSettled(serde_json::from_str(data)?)),
            "auction_cancelled" => Ok(Self::AuctionCancelled(serde_json::from_str(data)?)),
            _ => Ok(Self::Unknown {
                name: name.to_string(),
                payload: serde_json::from_str(data)?,
            }),
        }
    }
}

/// Kind of activity on the global featured feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum FeaturedKind {
    BidPlaced,
    BidIncreased,
}

/// One entry of the global featured-bid feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedEvent {
    pub kind: FeaturedKind,
    /// Epoch milliseconds
    pub at: i64,
    pub tx_hash: String,
    pub cycle_id: String,
    pub bidder: String,
    /// Running total in wei, kept as a string to avoid precision loss
    pub new_total_wei: String,
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidder_profile: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_meta: Option<Value>,
}
