//! Event protocol for the live bid-lifecycle feeds

pub mod types;

// Re-export key types for convenience
pub use types::{
    AuctionClose, AuctionEvent, AuctionExtension, AuctionStatus, BidFailure, BidTx, FeaturedEvent,
    FeaturedKind,
};
