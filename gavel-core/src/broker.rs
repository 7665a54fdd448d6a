//! Topic broker: fan-out of bid-lifecycle events to subscribed sinks
//!
//! The broker is an explicitly constructed, injectable service object. One
//! instance is created at process start and shared (via [`TopicBroker::clone`],
//! a cheap handle clone) with every request handler and publish call site.
//!
//! Topic sets are created lazily on first subscribe and only emptied, never
//! removed. Each sink owns a bounded FIFO queue, which is what gives the
//! per-topic ordering guarantee: events reach each attached sink in the order
//! `publish` was called. A sink whose queue is full or whose receiver is gone
//! is detached without disturbing delivery to the rest of the topic.

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::Utc;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::events::AuctionEvent;
use crate::topic::Topic;

/// One wire unit delivered to a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A named event with a JSON payload
    Event { name: String, data: String },
    /// A no-op comment line (keep-alive)
    Comment(String),
}

impl Frame {
    /// Event name, if this frame is an event
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Self::Event { name, .. } => Some(name),
            Self::Comment(_) => None,
        }
    }

    /// JSON payload, if this frame is an event
    pub fn data(&self) -> Option<&str> {
        match self {
            Self::Event { data, .. } => Some(data),
            Self::Comment(_) => None,
        }
    }

    /// True for keep-alive comment frames
    pub fn is_comment(&self) -> bool {
        matches!(self, Self::Comment(_))
    }

    /// The handshake frame sent first on every stream
    pub fn ready() -> Self {
        Self::Event {
            name: "ready".to_string(),
            data: r#"{"ok":true}"#.to_string(),
        }
    }
}

/// Tuning knobs for the broker
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Bounded queue depth per sink. A subscriber that falls this far behind
    /// is detached rather than buffered without limit.
    pub queue_capacity: usize,
    /// Interval between `: ping` keep-alive comments on every sink
    pub keep_alive_interval: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            keep_alive_interval: Duration::from_secs(25),
        }
    }
}

/// One subscriber's live output channel, attached to exactly one topic
struct Sink {
    id: Uuid,
    tx: mpsc::Sender<Frame>,
    closed: AtomicBool,
    keep_alive: CancellationToken,
}

impl Sink {
    /// Mark the sink closed. Returns true only for the call that actually
    /// transitioned the flag, which keeps teardown idempotent.
    fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        if first {
            self.keep_alive.cancel();
        }
        first
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct BrokerInner {
    topics: RwLock<HashMap<Topic, Vec<Arc<Sink>>>>,
    config: BrokerConfig,
}

impl BrokerInner {
    // Fan-out must keep working even if a writer panicked mid-update, so a
    // poisoned lock is entered rather than propagated.
    fn read_topics(&self) -> RwLockReadGuard<'_, HashMap<Topic, Vec<Arc<Sink>>>> {
        self.topics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_topics(&self) -> RwLockWriteGuard<'_, HashMap<Topic, Vec<Arc<Sink>>>> {
        self.topics.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-wide registry mapping a topic to the set of sinks subscribed to it.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct TopicBroker {
    inner: Arc<BrokerInner>,
}

impl TopicBroker {
    /// Create a broker with default tuning
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    /// Create a broker with custom queue depth / keep-alive interval
    pub fn with_config(config: BrokerConfig) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                topics: RwLock::new(HashMap::new()),
                config,
            }),
        }
    }

    /// Fan an event out to every sink currently attached to `topic`.
    ///
    /// Publishing to an absent or empty topic is a normal no-op. The payload
    /// is serialized once; sinks already marked closed are skipped, and an
    /// individual write failure detaches that one sink without aborting
    /// delivery to the rest. Returns the number of sinks written.
    pub fn publish(&self, topic: &Topic, event: &AuctionEvent) -> usize {
        let data = match event.payload_json() {
            Ok(data) => data,
            Err(e) => {
                warn!(topic = %topic, event = event.name(), "Failed to serialize payload: {}", e);
                return 0;
            }
        };
        let name = event.name();

        let mut delivered = 0;
        let mut any_detached = false;
        {
            let topics = self.inner.read_topics();
            let Some(sinks) = topics.get(topic) else {
                return 0;
            };

            for sink in sinks {
                if sink.is_closed() {
                    any_detached = true;
                    continue;
                }
                let frame = Frame::Event {
                    name: name.to_string(),
                    data: data.clone(),
                };
                match sink.tx.try_send(frame) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(topic = %topic, sink = %sink.id, "Sink queue full, dropping slow subscriber");
                        sink.close();
                        any_detached = true;
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!(topic = %topic, sink = %sink.id, "Sink receiver gone, detaching");
                        sink.close();
                        any_detached = true;
                    }
                }
            }
        }

        if any_detached {
            self.sweep(topic);
        }
        delivered
    }

    /// Attach a new sink to `topic`, creating the topic set if absent.
    ///
    /// The returned subscription yields the `ready` handshake as its first
    /// frame, then live events in publish order, interleaved with keep-alive
    /// comments. Dropping the subscription detaches the sink.
    ///
    /// Must be called from within a tokio runtime (the keep-alive ticker is a
    /// spawned task).
    pub fn subscribe(&self, topic: &Topic) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.config.queue_capacity);
        let sink = Arc::new(Sink {
            id: Uuid::new_v4(),
            tx,
            closed: AtomicBool::new(false),
            keep_alive: CancellationToken::new(),
        });

        // Enqueued before the sink is visible to publishers, so `ready` is
        // always the first frame a subscriber observes.
        let _ = sink.tx.try_send(Frame::ready());

        self.inner
            .write_topics()
            .entry(topic.clone())
            .or_default()
            .push(Arc::clone(&sink));

        self.spawn_keep_alive(&sink);
        debug!(topic = %topic, sink = %sink.id, "Subscribed");

        Subscription {
            topic: topic.clone(),
            sink,
            rx,
            broker: Arc::downgrade(&self.inner),
        }
    }

    /// Number of open sinks currently attached to `topic`
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.inner
            .read_topics()
            .get(topic)
            .map(|sinks| sinks.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }

    /// Number of open sinks across all topics
    pub fn total_subscribers(&self) -> usize {
        self.inner
            .read_topics()
            .values()
            .flatten()
            .filter(|s| !s.is_closed())
            .count()
    }

    fn spawn_keep_alive(&self, sink: &Arc<Sink>) {
        let interval = self.inner.config.keep_alive_interval;
        let tx = sink.tx.clone();
        let cancelled = sink.keep_alive.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        let ping = Frame::Comment(format!("ping {}", Utc::now().timestamp_millis()));
                        match tx.try_send(ping) {
                            Ok(()) => {}
                            // A full queue already carries traffic; the ping
                            // is only needed on quiet connections.
                            Err(mpsc::error::TrySendError::Full(_)) => {}
                            Err(mpsc::error::TrySendError::Closed(_)) => break,
                        }
                    }
                }
            }
        });
    }

    /// Drop closed sinks from a topic's set
    fn sweep(&self, topic: &Topic) {
        let mut topics = self.inner.write_topics();
        if let Some(sinks) = topics.get_mut(topic) {
            sinks.retain(|sink| !sink.is_closed());
        }
    }
}

impl Default for TopicBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TopicBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicBroker")
            .field("subscribers", &self.total_subscribers())
            .finish_non_exhaustive()
    }
}

/// Handle to one attached sink. Implements [`Stream`] over [`Frame`]s.
///
/// Teardown happens on drop or via [`Subscription::detach`]; both are
/// idempotent. Frames already queued at detach time are still drained, then
/// the stream ends.
pub struct Subscription {
    topic: Topic,
    sink: Arc<Sink>,
    rx: mpsc::Receiver<Frame>,
    broker: Weak<BrokerInner>,
}

impl Subscription {
    /// Unique id of the underlying sink
    pub fn id(&self) -> Uuid {
        self.sink.id
    }

    /// Topic this subscription is attached to
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Receive the next frame. Returns `None` once the subscription is
    /// detached and its queue drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        use futures::StreamExt;
        self.next().await
    }

    /// Mark the sink closed and remove it from its topic's set.
    ///
    /// Safe to call any number of times; only the first call mutates shared
    /// state. Subsequent `publish` calls will not write to this sink.
    pub fn detach(&self) {
        if self.sink.close()
            && let Some(inner) = self.broker.upgrade()
        {
            let mut topics = inner
                .topics
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(sinks) = topics.get_mut(&self.topic) {
                sinks.retain(|sink| sink.id != self.sink.id);
            }
            debug!(topic = %self.topic, sink = %self.sink.id, "Detached");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl Stream for Subscription {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        match self.rx.poll_recv(cx) {
            Poll::Ready(frame) => Poll::Ready(frame),
            // Drain-then-end: a detached sink keeps its queued frames but
            // receives nothing new, so an empty queue means the stream is over.
            Poll::Pending if self.sink.is_closed() => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.sink.id)
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}
