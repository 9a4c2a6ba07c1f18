//! Subscription registry
//!
//! Single source of truth for what should be subscribed. Entries are kept
//! in registration order so a reconnect replays them the way callers
//! issued them.

use indexmap::IndexMap;
use market_core::CurrencyPair;
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::domain::{Channel, EventCallback, StreamError, StreamEvent, SubscriptionId, Topic};

/// Guards callback invocation for one subscription.
///
/// Delivery and close both take the same lock, so once `close` returns no
/// callback is running and none will start. The lock is re-entrant so a
/// callback may unsubscribe itself.
pub struct DeliveryGate {
    lock: ReentrantMutex<()>,
    active: AtomicBool,
}

impl DeliveryGate {
    fn new() -> Self {
        DeliveryGate {
            lock: ReentrantMutex::new(()),
            active: AtomicBool::new(true),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Run `f` if the gate is still open. Returns whether it ran.
    pub fn deliver<F: FnOnce()>(&self, f: F) -> bool {
        let _guard = self.lock.lock();
        if !self.is_active() {
            return false;
        }
        f();
        true
    }

    /// Close the gate, waiting for any in-flight delivery to finish
    pub fn close(&self) {
        let _guard = self.lock.lock();
        self.active.store(false, Ordering::Release);
    }
}

struct Entry {
    id: SubscriptionId,
    payload: String,
    callback: EventCallback,
    gate: Arc<DeliveryGate>,
}

/// Result of a register call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub id: SubscriptionId,
    /// False when the topic was already registered and only the callback changed
    pub is_new: bool,
}

/// {topic, payload} pair used for replay after reconnect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSubscription {
    pub id: SubscriptionId,
    pub topic: Topic,
    pub payload: String,
}

/// Current callback of a topic together with its delivery gate
#[derive(Clone)]
pub struct Subscriber {
    pub id: SubscriptionId,
    callback: EventCallback,
    gate: Arc<DeliveryGate>,
}

impl Subscriber {
    /// Invoke the callback through the delivery gate
    pub fn deliver(&self, event: StreamEvent) -> bool {
        self.gate.deliver(|| (self.callback)(event))
    }

    pub fn is_active(&self) -> bool {
        self.gate.is_active()
    }
}

/// Topic -> subscription table shared by the client, supervisor and dispatch bus
pub struct SubscriptionRegistry {
    entries: Mutex<IndexMap<Topic, Entry>>,
    next_id: AtomicU64,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        SubscriptionRegistry {
            entries: Mutex::new(IndexMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register interest in a topic.
    ///
    /// Re-registering a topic keeps its id and wire payload and swaps in the
    /// new callback.
    pub fn register(&self, topic: Topic, payload: String, callback: EventCallback) -> Registration {
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get_mut(&topic) {
            tracing::debug!(topic = %topic, id = %entry.id, "Replacing callback of existing subscription");
            entry.callback = callback;
            return Registration {
                id: entry.id,
                is_new: false,
            };
        }

        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(topic = %topic, id = %id, "Registered subscription");
        entries.insert(
            topic,
            Entry {
                id,
                payload,
                callback,
                gate: Arc::new(DeliveryGate::new()),
            },
        );

        Registration { id, is_new: true }
    }

    /// Remove a subscription and stop its delivery.
    ///
    /// Returns the topic it was registered under.
    pub fn unregister(&self, id: SubscriptionId) -> Result<Topic, StreamError> {
        let (topic, entry) = {
            let mut entries = self.entries.lock();
            let index = entries
                .values()
                .position(|entry| entry.id == id)
                .ok_or(StreamError::UnknownSubscription(id))?;
            entries
                .shift_remove_index(index)
                .ok_or(StreamError::UnknownSubscription(id))?
        };

        // Outside the table lock: close waits for an in-flight callback
        entry.gate.close();
        tracing::debug!(topic = %topic, id = %id, "Unregistered subscription");

        Ok(topic)
    }

    /// Snapshot of every active subscription in registration order
    pub fn all_active(&self) -> Vec<ActiveSubscription> {
        self.entries
            .lock()
            .iter()
            .map(|(topic, entry)| ActiveSubscription {
                id: entry.id,
                topic: topic.clone(),
                payload: entry.payload.clone(),
            })
            .collect()
    }

    pub fn subscriber(&self, topic: &Topic) -> Option<Subscriber> {
        self.entries.lock().get(topic).map(|entry| Subscriber {
            id: entry.id,
            callback: Arc::clone(&entry.callback),
            gate: Arc::clone(&entry.gate),
        })
    }

    /// Registered topics of one channel for a pair
    pub fn topics_for(&self, pair: &CurrencyPair, channel: Channel) -> Vec<Topic> {
        self.entries
            .lock()
            .keys()
            .filter(|topic| topic.channel() == channel && topic.pair() == pair)
            .cloned()
            .collect()
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.entries.lock().keys().cloned().collect()
    }

    pub fn contains(&self, topic: &Topic) -> bool {
        self.entries.lock().contains_key(topic)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
