//! Live feed client: room connections, reconnection, handler dispatch
//!
//! Connection identity (the room URL, derived from auction id / wallet
//! address) is separated from the handler set: handlers live behind a shared
//! lock and can be replaced at any time without touching the transport. Only
//! a different identifier warrants a new client.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::StreamExt;
use gavel_core::Topic;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::decode::{SseDecoder, WireFrame};
use crate::error::ClientError;
use crate::handlers::BidEventHandlers;
use crate::reconnect::{ConnectionState, ReconnectConfig};

type SharedHandlers = Arc<RwLock<BidEventHandlers>>;

/// Configuration for a live feed client
#[derive(Debug, Clone)]
pub struct LiveFeedConfig {
    /// Server base URL, e.g. `http://127.0.0.1:7810`
    pub base_url: String,
    /// Auction room to join, if any
    pub auction_id: Option<String>,
    /// Wallet room to join, if any (address case-folded by the topic builder)
    pub wallet: Option<String>,
    /// Reconnection policy applied to each room independently
    pub reconnect: ReconnectConfig,
}

impl LiveFeedConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auction_id: None,
            wallet: None,
            reconnect: ReconnectConfig::default(),
        }
    }

    pub fn auction(mut self, id: impl Into<String>) -> Self {
        self.auction_id = Some(id.into());
        self
    }

    pub fn wallet(mut self, address: impl Into<String>) -> Self {
        self.wallet = Some(address.into());
        self
    }

    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }
}

/// Client for up to two live rooms (auction and wallet) sharing one handler
/// table. Dropping the client closes both connections.
pub struct LiveFeedClient {
    handlers: SharedHandlers,
    rooms: Vec<RoomSubscription>,
}

impl LiveFeedClient {
    /// Open the configured rooms. An absent identifier means that room is
    /// simply not opened; a client with neither identifier holds no
    /// connections.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(
        config: LiveFeedConfig,
        handlers: BidEventHandlers,
    ) -> Result<Self, ClientError> {
        let base = Url::parse(&config.base_url).map_err(|source| ClientError::InvalidBaseUrl {
            url: config.base_url.clone(),
            source,
        })?;
        let handlers: SharedHandlers = Arc::new(RwLock::new(handlers));

        let mut rooms = Vec::new();
        if let Some(id) = &config.auction_id {
            rooms.push(RoomSubscription::spawn(
                room_url(&base, &Topic::auction(id.clone()))?,
                config.reconnect.clone(),
                Arc::clone(&handlers),
            ));
        }
        if let Some(address) = &config.wallet {
            rooms.push(RoomSubscription::spawn(
                room_url(&base, &Topic::wallet(address))?,
                config.reconnect.clone(),
                Arc::clone(&handlers),
            ));
        }

        Ok(Self { handlers, rooms })
    }

    /// Replace the handler set without reconnecting. Events received after
    /// this call dispatch to the new handlers.
    ///
    /// Must not be called from inside a handler.
    pub fn set_handlers(&self, handlers: BidEventHandlers) {
        *self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner) = handlers;
    }

    /// The open room subscriptions, auction room first
    pub fn rooms(&self) -> &[RoomSubscription] {
        &self.rooms
    }

    /// Close every room connection
    pub fn close(&mut self) {
        for room in &self.rooms {
            room.close();
        }
    }
}

impl Drop for LiveFeedClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for LiveFeedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveFeedClient")
            .field("rooms", &self.rooms)
            .finish_non_exhaustive()
    }
}

/// Build the stream URL for a topic. Both sides go through [`Topic`], so the
/// wallet case-folding matches the server's.
fn room_url(base: &Url, topic: &Topic) -> Result<Url, ClientError> {
    let path = match topic {
        Topic::Auction(id) => format!("live/auctions/{}", id),
        Topic::Wallet(address) => format!("live/wallets/{}", address),
    };
    Ok(base.join(&path)?)
}

/// One room's connection task and its observable state
pub struct RoomSubscription {
    url: Url,
    state_rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RoomSubscription {
    fn spawn(url: Url, reconnect: ReconnectConfig, handlers: SharedHandlers) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_room(
            url.clone(),
            reconnect,
            handlers,
            state_tx,
            cancel.clone(),
        ));
        Self {
            url,
            state_rx,
            cancel,
            task,
        }
    }

    /// The stream URL this room is attached to
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch receiver for awaiting state transitions
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Ask the room task to shut down
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for RoomSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

impl fmt::Debug for RoomSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomSubscription")
            .field("url", &self.url.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Connection loop for one room: connect, stream, back off, repeat.
async fn run_room(
    url: Url,
    config: ReconnectConfig,
    handlers: SharedHandlers,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
) {
    let client = reqwest::Client::new();
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            break;
        }
        let _ = state_tx.send(ConnectionState::Connecting);

        match open_stream(&client, &url, &cancel).await {
            Ok(Some(response)) => {
                info!(url = %url, "Live room connected");
                let _ = state_tx.send(ConnectionState::Open);
                attempt = 0;
                if read_stream(response, &handlers, &cancel).await.is_break() {
                    break;
                }
            }
            // Cancelled while the connect was in flight
            Ok(None) => break,
            Err(e) => {
                warn!(url = %url, "Live room connect failed: {}", e);
            }
        }

        if cancel.is_cancelled() {
            break;
        }
        if config.exhausted(attempt) {
            warn!(url = %url, attempts = attempt, "Retry ceiling reached, giving up");
            break;
        }

        let delay = config.delay_for_attempt(attempt);
        attempt += 1;
        let _ = state_tx.send(ConnectionState::BackingOff);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    let _ = state_tx.send(ConnectionState::Closed);
}

async fn open_stream(
    client: &reqwest::Client,
    url: &Url,
    cancel: &CancellationToken,
) -> Result<Option<reqwest::Response>, reqwest::Error> {
    tokio::select! {
        _ = cancel.cancelled() => Ok(None),
        result = client.get(url.clone()).send() => {
            let response = result?.error_for_status()?;
            Ok(Some(response))
        }
    }
}

/// Pump one connected stream. `Break` means the room was closed; `Continue`
/// means the transport dropped and the caller should back off and retry.
async fn read_stream(
    response: reqwest::Response,
    handlers: &SharedHandlers,
    cancel: &CancellationToken,
) -> ControlFlow<()> {
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return ControlFlow::Break(()),
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    for frame in decoder.feed(&bytes) {
                        match frame {
                            WireFrame::Event { name, data } => {
                                handlers
                                    .read()
                                    .unwrap_or_else(PoisonError::into_inner)
                                    .dispatch_wire(&name, &data);
                            }
                            WireFrame::Comment(text) => {
                                debug!(comment = %text, "Keep-alive received");
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!("Live room stream error: {}", e);
                    return ControlFlow::Continue(());
                }
                None => {
                    debug!("Live room stream ended");
                    return ControlFlow::Continue(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_sets_rooms() {
        let config = LiveFeedConfig::new("http://127.0.0.1:7810")
            .auction("42")
            .wallet("0xABC");
        assert_eq!(config.auction_id.as_deref(), Some("42"));
        assert_eq!(config.wallet.as_deref(), Some("0xABC"));
    }

    #[test]
    fn room_url_builds_auction_and_wallet_paths() {
        let base = Url::parse("http://127.0.0.1:7810").unwrap();

        let auction = room_url(&base, &Topic::auction("42")).unwrap();
        assert_eq!(auction.as_str(), "http://127.0.0.1:7810/live/auctions/42");

        // The topic builder folds the address; the URL follows
        let wallet = room_url(&base, &Topic::wallet("0xABC")).unwrap();
        assert_eq!(wallet.as_str(), "http://127.0.0.1:7810/live/wallets/0xabc");
    }

    #[tokio::test]
    async fn connect_rejects_malformed_base_url() {
        let result = LiveFeedClient::connect(
            LiveFeedConfig::new("not a url").auction("42"),
            BidEventHandlers::new(),
        );
        assert!(matches!(result, Err(ClientError::InvalidBaseUrl { .. })));
    }

    #[tokio::test]
    async fn absent_identifiers_open_no_rooms() {
        let client = LiveFeedClient::connect(
            LiveFeedConfig::new("http://127.0.0.1:7810"),
            BidEventHandlers::new(),
        )
        .unwrap();
        assert!(client.rooms().is_empty());
    }
}
