//! gavel-core: Core library for the gavel live event layer
//!
//! This crate provides the in-process event distribution primitives for an
//! NFT-marketplace backend:
//!
//! - **Event protocol** - [`AuctionEvent`] and friends: the typed bid-lifecycle
//!   vocabulary shared by publishers and subscribers
//! - **Topic naming** - [`Topic`] for canonical `auction:<id>` / `wallet:<addr>`
//!   channel keys
//! - **Topic broker** - [`TopicBroker`] for fan-out of events to every sink
//!   subscribed to a topic
//! - **Replay buffer** - [`ReplayBuffer`] for the bounded, newest-first history
//!   of the global featured-bid feed
//!
//! # Quick Start
//!
//! ```
//! use gavel_core::{AuctionEvent, BidTx, Topic, TopicBroker};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let broker = TopicBroker::new();
//!     let topic = Topic::auction("42");
//!
//!     let mut sub = broker.subscribe(&topic);
//!
//!     // First frame is always the `ready` handshake.
//!     let ready = sub.recv().await.unwrap();
//!     assert_eq!(ready.event_name(), Some("ready"));
//!
//!     broker.publish(&topic, &AuctionEvent::BidPending(BidTx::default()));
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! on-chain indexer ──publish──▶ TopicBroker ──Frame──▶ sink ──▶ SSE response
//!                 └──push─────▶ ReplayBuffer ──┬─────▶ live listeners
//!                                              └─────▶ snapshot(limit)
//! ```
//!
//! The broker and the replay buffer are independent paths fed by the same
//! producer; there is no ordering guarantee between them.

pub mod broker;
pub mod error;
pub mod events;
pub mod replay;
pub mod topic;

// Re-export key types for convenience
pub use broker::{BrokerConfig, Frame, Subscription, TopicBroker};
pub use error::GavelError;
pub use events::{
    AuctionClose, AuctionEvent, AuctionExtension, AuctionStatus, BidFailure, BidTx, FeaturedEvent,
    FeaturedKind,
};
pub use replay::{FEATURED_BUFFER_MAX, ListenerGuard, ReplayBuffer};
pub use topic::{Topic, TopicError};
