//! Shared application state for the gavel server

use chrono::{DateTime, Utc};
use gavel_core::{AuctionEvent, FeaturedEvent, ReplayBuffer, Topic, TopicBroker};

/// Shared application state accessible by all handlers.
///
/// Constructed once at process start; every handler and publish call site
/// works against the same broker and replay buffer through this state.
#[derive(Clone)]
pub struct AppState {
    /// Topic broker for auction/wallet room fan-out
    pub broker: TopicBroker,
    /// Replay buffer backing the global featured feed
    pub featured: ReplayBuffer,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create a new AppState with default components
    pub fn new() -> Self {
        Self::with_components(TopicBroker::new(), ReplayBuffer::new())
    }

    /// Create AppState from pre-built components (custom tuning, testing)
    pub fn with_components(broker: TopicBroker, featured: ReplayBuffer) -> Self {
        Self {
            broker,
            featured,
            started_at: Utc::now(),
        }
    }

    /// Publish a lifecycle event on an auction's topic.
    ///
    /// Returns the number of sinks written. This is a call site for the
    /// on-chain indexer; events enter the system only through these helpers,
    /// never through an HTTP endpoint.
    pub fn publish_auction(&self, auction_id: &str, event: &AuctionEvent) -> usize {
        self.broker.publish(&Topic::auction(auction_id), event)
    }

    /// Publish a lifecycle event on a wallet's topic. The address is
    /// case-folded by the topic builder.
    pub fn publish_wallet(&self, address: &str, event: &AuctionEvent) -> usize {
        self.broker.publish(&Topic::wallet(address), event)
    }

    /// Store a featured-feed event and fan it out to live listeners
    pub fn push_featured(&self, event: FeaturedEvent) {
        self.featured.push(event);
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use gavel_core::{BidTx, FeaturedKind};

    use super::*;

    #[test]
    fn app_state_new() {
        let state = AppState::new();
        assert!(state.uptime_seconds() >= 0);
        assert_eq!(state.broker.total_subscribers(), 0);
    }

    #[tokio::test]
    async fn publish_helpers_route_to_canonical_topics() {
        let state = AppState::new();
        let mut sub = state.broker.subscribe(&Topic::wallet("0xabc"));

        // Publisher uses different casing; the helper folds it
        let delivered = state.publish_wallet(
            "0xABC",
            &AuctionEvent::BidPending(BidTx::default()),
        );
        assert_eq!(delivered, 1);

        assert_eq!(sub.recv().await.unwrap().event_name(), Some("ready"));
        assert_eq!(sub.recv().await.unwrap().event_name(), Some("bid_pending"));
    }

    #[test]
    fn push_featured_lands_in_the_buffer() {
        let state = AppState::new();
        state.push_featured(FeaturedEvent {
            kind: FeaturedKind::BidPlaced,
            at: 0,
            tx_hash: "0x1".to_string(),
            cycle_id: "c1".to_string(),
            bidder: "0xabc".to_string(),
            new_total_wei: "10".to_string(),
            collection: "apes".to_string(),
            bidder_profile: None,
            collection_meta: None,
        });
        assert_eq!(state.featured.len(), 1);
    }
}
