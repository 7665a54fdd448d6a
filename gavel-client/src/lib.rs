//! gavel-client: Subscriber client for the live auction event streams
//!
//! Opens up to two persistent SSE connections (an auction room and,
//! optionally, a wallet room), decodes named events into the typed
//! bid-lifecycle protocol, and invokes caller-supplied handlers. The client
//! owns reconnection (jittered exponential backoff with an optional retry
//! ceiling) and teardown; the handler set can be swapped at any time without
//! reconnecting.
//!
//! ```no_run
//! use gavel_client::{BidEventHandlers, LiveFeedClient, LiveFeedConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gavel_client::ClientError> {
//!     let handlers = BidEventHandlers::new()
//!         .on_bid_pending(|bid| println!("pending bid {}", bid.tx_hash))
//!         .on_bid_confirmed(|bid| println!("confirmed bid {}", bid.tx_hash));
//!
//!     let config = LiveFeedConfig::new("http://127.0.0.1:7810")
//!         .auction("42")
//!         .wallet("0xABCdef");
//!
//!     let _client = LiveFeedClient::connect(config, handlers)?;
//!     // connections live until the client is closed or dropped
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod decode;
pub mod error;
pub mod handlers;
pub mod reconnect;

// Re-export key types for convenience
pub use client::{LiveFeedClient, LiveFeedConfig, RoomSubscription};
pub use decode::{SseDecoder, WireFrame};
pub use error::ClientError;
pub use handlers::BidEventHandlers;
pub use reconnect::{ConnectionState, ReconnectConfig};
