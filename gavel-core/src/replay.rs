//! Replay buffer for the global featured-bid feed
//!
//! A bounded, newest-first ring decoupled from the topic broker. `push` both
//! stores the event and fans it out to live listeners, in that order, so a
//! client that snapshots right after missing a live push still observes the
//! event. The ring lives for the process lifetime and is never reset.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use tracing::warn;

use crate::events::FeaturedEvent;

/// Fixed bound on stored featured-feed history
pub const FEATURED_BUFFER_MAX: usize = 100;

type Callback = Arc<dyn Fn(&FeaturedEvent) + Send + Sync>;

struct ListenerEntry {
    id: u64,
    callback: Callback,
}

struct ReplayInner {
    capacity: usize,
    /// Newest first; truncated to `capacity` on every push
    entries: Mutex<VecDeque<FeaturedEvent>>,
    /// Invoked in registration order on every push
    listeners: RwLock<Vec<ListenerEntry>>,
    next_listener_id: AtomicU64,
}

impl ReplayInner {
    fn lock_entries(&self) -> std::sync::MutexGuard<'_, VecDeque<FeaturedEvent>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove_listener(&self, id: u64) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|entry| entry.id != id);
    }
}

/// Bounded newest-first history plus live listener fan-out.
///
/// Cloning yields another handle to the same buffer.
#[derive(Clone)]
pub struct ReplayBuffer {
    inner: Arc<ReplayInner>,
}

impl ReplayBuffer {
    /// Buffer with the standard featured-feed capacity
    pub fn new() -> Self {
        Self::with_capacity(FEATURED_BUFFER_MAX)
    }

    /// Buffer with a custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(ReplayInner {
                capacity,
                entries: Mutex::new(VecDeque::with_capacity(capacity)),
                listeners: RwLock::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
            }),
        }
    }

    /// Store a copy of `event` at the front of the ring (evicting the oldest
    /// entry past capacity), then deliver the original to every registered
    /// listener in registration order. A panicking listener is logged and
    /// skipped; the rest still run.
    pub fn push(&self, event: FeaturedEvent) {
        {
            let mut entries = self.inner.lock_entries();
            entries.push_front(event.clone());
            entries.truncate(self.inner.capacity);
        }

        // Callbacks run without the registry lock held, so a listener may
        // register or unsubscribe without deadlocking.
        let listeners: Vec<(u64, Callback)> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| (entry.id, Arc::clone(&entry.callback)))
            .collect();

        for (id, callback) in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                warn!(listener = id, "Featured feed listener panicked, skipping");
            }
        }
    }

    /// Up to `limit` most-recent entries, newest first. The limit is clamped
    /// to the buffer capacity; the buffer is not mutated.
    pub fn snapshot(&self, limit: usize) -> Vec<FeaturedEvent> {
        self.inner
            .lock_entries()
            .iter()
            .take(limit.min(self.inner.capacity))
            .cloned()
            .collect()
    }

    /// Register a callback invoked on every [`push`](Self::push). Dropping the
    /// returned guard (or calling [`ListenerGuard::unsubscribe`]) deregisters
    /// it.
    pub fn add_listener(
        &self,
        callback: impl Fn(&FeaturedEvent) + Send + Sync + 'static,
    ) -> ListenerGuard {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ListenerEntry {
                id,
                callback: Arc::new(callback),
            });
        ListenerGuard {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.inner.lock_entries().len()
    }

    /// True when no entries are stored
    pub fn is_empty(&self) -> bool {
        self.inner.lock_entries().is_empty()
    }

    /// Fixed capacity of the ring
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for ReplayBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReplayBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayBuffer")
            .field("len", &self.len())
            .field("capacity", &self.inner.capacity)
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

/// Deregisters its listener when dropped
pub struct ListenerGuard {
    id: u64,
    inner: Weak<ReplayInner>,
}

impl ListenerGuard {
    /// Explicitly deregister the listener
    pub fn unsubscribe(self) {}
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.remove_listener(self.id);
        }
    }
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::events::FeaturedKind;

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

    fn cycle_ids(events: &[FeaturedEvent]) -> Vec<&str> {
        events.iter().map(|e| e.cycle_id.as_str()).collect()
    }

    #[test]
    fn snapshot_returns_newest_first() {
        let buffer = ReplayBuffer::new();
        for id in ["c1", "c2", "c3"] {
            buffer.push(featured(id));
        }

        let snapshot = buffer.snapshot(2);
        assert_eq!(cycle_ids(&snapshot), vec!["c3", "c2"]);
    }

    #[test]
    fn buffer_never_exceeds_capacity() {
        let buffer = ReplayBuffer::with_capacity(3);
        for i in 0..10 {
            buffer.push(featured(&format!("c{}", i)));
        }

        assert_eq!(buffer.len(), 3);
        let snapshot = buffer.snapshot(3);
        assert_eq!(cycle_ids(&snapshot), vec!["c9", "c8", "c7"]);
    }

    #[test]
    fn snapshot_limit_is_clamped() {
        let buffer = ReplayBuffer::with_capacity(5);
        buffer.push(featured("c1"));
        buffer.push(featured("c2"));

        // More than stored
        assert_eq!(buffer.snapshot(100).len(), 2);
        // Zero
        assert!(buffer.snapshot(0).is_empty());
        // Snapshot does not mutate
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn listeners_receive_every_push_in_registration_order() {
        let buffer = ReplayBuffer::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let seen = Arc::clone(&seen);
            buffer.add_listener(move |event| {
                seen.lock().unwrap().push(format!("first:{}", event.cycle_id));
            })
        };
        let second = {
            let seen = Arc::clone(&seen);
            buffer.add_listener(move |event| {
                seen.lock().unwrap().push(format!("second:{}", event.cycle_id));
            })
        };

        buffer.push(featured("c1"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:c1".to_string(), "second:c1".to_string()]
        );
        drop(first);
        drop(second);
    }

    #[test]
    fn panicking_listener_does_not_block_the_others() {
        let buffer = ReplayBuffer::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _bad = buffer.add_listener(|_| panic!("listener exploded"));
        let _good = {
            let seen = Arc::clone(&seen);
            buffer.add_listener(move |event| {
                seen.lock().unwrap().push(event.cycle_id.clone());
            })
        };

        buffer.push(featured("c1"));
        buffer.push(featured("c2"));

        assert_eq!(*seen.lock().unwrap(), vec!["c1".to_string(), "c2".to_string()]);
    }

    #[test]
    fn dropped_guard_deregisters_its_listener() {
        let buffer = ReplayBuffer::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let guard = {
            let seen = Arc::clone(&seen);
            buffer.add_listener(move |event| {
                seen.lock().unwrap().push(event.cycle_id.clone());
            })
        };
        assert_eq!(buffer.listener_count(), 1);

        buffer.push(featured("c1"));
        guard.unsubscribe();
        buffer.push(featured("c2"));

        assert_eq!(buffer.listener_count(), 0);
        assert_eq!(*seen.lock().unwrap(), vec!["c1".to_string()]);
    }

    #[test]
    fn event_is_stored_before_listeners_run() {
        let buffer = ReplayBuffer::new();
        let observed = Arc::new(Mutex::new(Vec::new()));

        let _guard = {
            let handle = buffer.clone();
            let observed = Arc::clone(&observed);
            buffer.add_listener(move |_event| {
                // A listener that snapshots must already see the event it was
                // called for.
                let snapshot = handle.snapshot(1);
                observed
                    .lock()
                    .unwrap()
                    .push(snapshot.first().map(|e| e.cycle_id.clone()));
            })
        };

        buffer.push(featured("c1"));
        assert_eq!(*observed.lock().unwrap(), vec![Some("c1".to_string())]);
    }

    #[tokio::test]
    async fn concurrent_push_and_snapshot_are_safe() {
        let buffer = ReplayBuffer::with_capacity(8);

        let pusher = {
            let buffer = buffer.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    buffer.push(featured(&format!("c{}", i)));
                    tokio::task::yield_now().await;
                }
            })
        };
        let snapshotter = {
            let buffer = buffer.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let snapshot = buffer.snapshot(8);
                    assert!(snapshot.len() <= 8);
                    tokio::task::yield_now().await;
                }
            })
        };

        pusher.await.unwrap();
        snapshotter.await.unwrap();
        assert_eq!(buffer.len(), 8);
    }
}
