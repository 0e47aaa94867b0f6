//! Subscription broker fanning catalog snapshots out to observers.

use crate::context::CancelToken;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use tracing::{debug, info, trace, warn};

use super::cache::CatalogCache;
use super::types::{Snapshot, SubscriberId, Subscription};

/// Outcome of handing a snapshot to one observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Delivery {
    Delivered,
    /// An unread snapshot was replaced by the newer one.
    Coalesced,
}

/// Internal observer state.
struct Observer {
    sender: Sender<Snapshot>,
    /// Second handle on the observer's slot, used to evict a stale snapshot.
    stale: Receiver<Snapshot>,
}

impl Observer {
    /// Put `snapshot` in the slot without blocking, evicting whatever is unread.
    fn deliver(&self, snapshot: &Snapshot) -> Delivery {
        let mut outcome = Delivery::Delivered;
        loop {
            match self.sender.try_send(snapshot.clone()) {
                Ok(()) => return outcome,
                Err(TrySendError::Full(_)) => {
                    let _ = self.stale.try_recv();
                    outcome = Delivery::Coalesced;
                }
                // Unreachable while `stale` is alive; nothing to deliver to either way.
                Err(TrySendError::Disconnected(_)) => return outcome,
            }
        }
    }

    /// Discard anything unread so a closed stream yields nothing more.
    fn drain(&self) {
        while self.stale.try_recv().is_ok() {}
    }
}

struct BrokerState {
    observers: HashMap<SubscriberId, Observer>,
    cache: CatalogCache,
    snapshot: Snapshot,
}

struct Shared {
    state: Mutex<BrokerState>,
    next_id: AtomicU64,
}

impl Shared {
    fn deregister(&self, id: SubscriberId) -> bool {
        let mut state = self.state.lock();
        match state.observers.remove(&id) {
            Some(observer) => {
                observer.drain();
                info!(subscriber = %id, remaining = state.observers.len(), "subscriber deregistered");
                true
            }
            None => false,
        }
    }
}

/// Holds the live observer registry and the catalog cache behind one lock.
///
/// Registration, deregistration and publishing each take the lock for their
/// whole critical section, so every observer sees snapshots in commit order.
/// Nothing here can fail: delivery never blocks and slow observers only miss
/// intermediate snapshots.
pub struct SubscriptionBroker {
    shared: Arc<Shared>,
}

impl SubscriptionBroker {
    /// Create a broker with an empty cache.
    pub fn new() -> Self {
        Self::with_cache(CatalogCache::new())
    }

    /// Create a broker seeded with a cache.
    pub fn with_cache(cache: CatalogCache) -> Self {
        let snapshot = cache.snapshot();
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BrokerState {
                    observers: HashMap::new(),
                    cache,
                    snapshot,
                }),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register an observer for as long as `cancel` stays live.
    ///
    /// The current snapshot is replayed into the new subscription before this
    /// returns. A watcher thread deregisters the observer once the token is
    /// cancelled or every clone of it is dropped. Subscribing with a token that
    /// is already cancelled returns a closed stream and registers nothing.
    pub fn subscribe(&self, cancel: &CancelToken) -> Subscription {
        let id = SubscriberId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(1);

        if cancel.is_cancelled() {
            debug!(subscriber = %id, "subscribe with cancelled token");
            return Subscription { id, receiver };
        }

        {
            let mut state = self.shared.state.lock();
            let observer = Observer {
                sender,
                stale: receiver.clone(),
            };
            observer.deliver(&state.snapshot);
            state.observers.insert(id, observer);
            info!(subscriber = %id, observers = state.observers.len(), "subscriber registered");
        }

        self.spawn_watcher(id, cancel);
        Subscription { id, receiver }
    }

    /// Deregister explicitly. Returns false if the subscriber was already gone.
    pub fn deregister(&self, id: SubscriberId) -> bool {
        self.shared.deregister(id)
    }

    /// Apply `update` to the cache and deliver the resulting snapshot to every
    /// registered observer.
    pub fn publish<F>(&self, update: F) -> Snapshot
    where
        F: FnOnce(&mut CatalogCache),
    {
        let mut state = self.shared.state.lock();
        update(&mut state.cache);
        let snapshot = state.cache.snapshot();
        state.snapshot = snapshot.clone();

        let mut coalesced = 0usize;
        for (id, observer) in &state.observers {
            if observer.deliver(&snapshot) == Delivery::Coalesced {
                trace!(subscriber = %id, "replaced unread snapshot");
                coalesced += 1;
            }
        }

        debug!(
            recipes = snapshot.len(),
            observers = state.observers.len(),
            coalesced,
            "published snapshot"
        );
        snapshot
    }

    /// The snapshot new subscribers are replayed.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.state.lock().snapshot.clone()
    }

    /// Get subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().observers.len()
    }

    pub fn is_registered(&self, id: SubscriberId) -> bool {
        self.shared.state.lock().observers.contains_key(&id)
    }

    fn spawn_watcher(&self, id: SubscriberId, cancel: &CancelToken) {
        let signal = cancel.signal();
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);

        let spawned = thread::Builder::new()
            .name(format!("catalog-subscriber-{id}"))
            .spawn(move || {
                // Never yields a value; returns once the token is cancelled or dropped.
                let _ = signal.recv();
                if let Some(shared) = shared.upgrade() {
                    shared.deregister(id);
                }
            });

        if let Err(e) = spawned {
            warn!(subscriber = %id, error = %e, "failed to spawn subscription watcher");
            self.shared.deregister(id);
        }
    }
}

impl Default for SubscriptionBroker {
    fn default() -> Self {
        Self::new()
    }
}
