//! Dispatch Bus
//!
//! Fans decoded events out to subscriber callbacks. Every topic gets its own
//! bounded queue drained by a dedicated task, so the read loop only ever
//! pushes into a queue and never runs consumer code.
//!
//! Callbacks run on tokio's blocking pool, one at a time per topic. A
//! callback that blocks holds up its own topic only, even on a
//! `current_thread` runtime.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;

use crate::application::registry::SubscriptionRegistry;
use crate::domain::{StreamEvent, Topic};

/// Default per-topic queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

struct TopicQueue {
    events: Mutex<VecDeque<StreamEvent>>,
    notify: Notify,
    closed: AtomicBool,
}

impl TopicQueue {
    fn new(capacity: usize) -> Self {
        TopicQueue {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueue, evicting the oldest event when full. Returns true if one was evicted.
    fn push(&self, event: StreamEvent, capacity: usize) -> bool {
        let evicted = {
            let mut events = self.events.lock();
            let evicted = if events.len() >= capacity {
                events.pop_front();
                true
            } else {
                false
            };
            events.push_back(event);
            evicted
        };
        self.notify.notify_one();
        evicted
    }

    fn pop(&self) -> Option<StreamEvent> {
        self.events.lock().pop_front()
    }

    fn len(&self) -> usize {
        self.events.lock().len()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.events.lock().clear();
        self.notify.notify_one();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// In-process publish/subscribe router from topics to callbacks
pub struct DispatchBus {
    queues: DashMap<Topic, Arc<TopicQueue>>,
    registry: Arc<SubscriptionRegistry>,
    capacity: usize,
    dropped: AtomicU64,
}

impl DispatchBus {
    pub fn new(registry: Arc<SubscriptionRegistry>, capacity: usize) -> Self {
        DispatchBus {
            queues: DashMap::new(),
            registry,
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue `event` for the subscriber of `topic`.
    ///
    /// Returns false (and discards the event) when nobody is subscribed.
    /// Must be called from within a tokio runtime.
    pub fn publish(&self, topic: &Topic, event: StreamEvent) -> bool {
        if !self.registry.contains(topic) {
            tracing::trace!(topic = %topic, "No subscriber, event discarded");
            return false;
        }

        let queue = self.queue_for(topic);
        if queue.push(event, self.capacity) {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(
                topic = %topic,
                capacity = self.capacity,
                dropped_total = dropped,
                "Backpressure: dispatch queue full, dropped oldest event"
            );
        }
        true
    }

    /// Tell every current subscriber the connection is gone for good
    pub fn publish_failure(&self, reason: &str) {
        let reason: Arc<str> = Arc::from(reason);
        for topic in self.registry.topics() {
            self.publish(&topic, StreamEvent::ConnectionFailed(Arc::clone(&reason)));
        }
    }

    /// Tear down the queue and delivery task of a topic; pending events are discarded
    pub fn close_topic(&self, topic: &Topic) {
        if let Some((_, queue)) = self.queues.remove(topic) {
            queue.close();
            tracing::debug!(topic = %topic, "Closed dispatch queue");
        }
    }

    pub fn close_all(&self) {
        let topics: Vec<Topic> = self.queues.iter().map(|q| q.key().clone()).collect();
        for topic in topics {
            self.close_topic(&topic);
        }
    }

    /// Events waiting in a topic's queue
    pub fn pending(&self, topic: &Topic) -> usize {
        self.queues.get(topic).map(|q| q.len()).unwrap_or(0)
    }

    /// Total events evicted by backpressure since creation
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn queue_for(&self, topic: &Topic) -> Arc<TopicQueue> {
        if let Some(queue) = self.queues.get(topic) {
            return Arc::clone(queue.value());
        }

        match self.queues.entry(topic.clone()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let queue = Arc::new(TopicQueue::new(self.capacity));
                entry.insert(Arc::clone(&queue));
                tokio::spawn(drain(
                    topic.clone(),
                    Arc::clone(&queue),
                    Arc::clone(&self.registry),
                ));
                queue
            }
        }
    }
}

/// Delivery task of one topic
async fn drain(topic: Topic, queue: Arc<TopicQueue>, registry: Arc<SubscriptionRegistry>) {
    tracing::trace!(topic = %topic, "Dispatch task started");

    loop {
        if queue.is_closed() {
            break;
        }

        let Some(event) = queue.pop() else {
            queue.notify.notified().await;
            continue;
        };

        // Looked up per event so a replaced callback applies to queued events too
        let Some(subscriber) = registry.subscriber(&topic) else {
            continue;
        };

        let id = subscriber.id;
        match tokio::task::spawn_blocking(move || subscriber.deliver(event)).await {
            Ok(_) => {}
            Err(e) if e.is_panic() => {
                tracing::error!(topic = %topic, id = %id, "Subscriber callback panicked");
            }
            Err(e) => {
                tracing::warn!(topic = %topic, id = %id, error = %e, "Delivery task cancelled");
            }
        }
    }

    tracing::trace!(topic = %topic, "Dispatch task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventCallback;
    use market_core::CurrencyPair;
    use std::time::Duration;

    fn topic() -> Topic {
        Topic::trades(CurrencyPair::new("BTC", "USDT"))
    }

    fn tagged(tag: usize) -> StreamEvent {
        StreamEvent::ConnectionFailed(Arc::from(tag.to_string()))
    }

    fn tag_of(event: &StreamEvent) -> usize {
        match event {
            StreamEvent::ConnectionFailed(tag) => tag.parse().unwrap(),
            other => panic!("unexpected event {:?}", other),
        }
    }

    fn recording_callback(seen: &Arc<Mutex<Vec<usize>>>) -> EventCallback {
        let seen = Arc::clone(seen);
        Arc::new(move |event| seen.lock().push(tag_of(&event)))
    }

    async fn wait_for(seen: &Arc<Mutex<Vec<usize>>>, count: usize) {
        for _ in 0..200 {
            if seen.lock().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {} events, got {:?}", count, seen.lock());
    }

    #[tokio::test]
    async fn test_publish_without_subscriber_is_noop() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let bus = DispatchBus::new(registry, 4);

        assert!(!bus.publish(&topic(), tagged(1)));
        assert_eq!(bus.pending(&topic()), 0);
    }

    #[tokio::test]
    async fn test_delivers_in_publish_order() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        registry.register(topic(), String::new(), recording_callback(&seen));
        let bus = DispatchBus::new(Arc::clone(&registry), 16);

        for i in 0..10 {
            assert!(bus.publish(&topic(), tagged(i)));
        }

        wait_for(&seen, 10).await;
        assert_eq!(*seen.lock(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_backpressure_drops_oldest() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        registry.register(topic(), String::new(), recording_callback(&seen));
        let bus = DispatchBus::new(Arc::clone(&registry), 4);

        // Single-threaded runtime: the delivery task cannot run until we yield
        for i in 0..10 {
            bus.publish(&topic(), tagged(i));
        }
        assert_eq!(bus.pending(&topic()), 4);
        assert_eq!(bus.dropped_events(), 6);

        wait_for(&seen, 4).await;
        assert_eq!(*seen.lock(), vec![6, 7, 8, 9]);
    }

    #[tokio::test]
    async fn test_close_topic_discards_pending() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        registry.register(topic(), String::new(), recording_callback(&seen));
        let bus = DispatchBus::new(Arc::clone(&registry), 16);

        bus.publish(&topic(), tagged(1));
        bus.close_topic(&topic());
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(seen.lock().is_empty());
        assert_eq!(bus.pending(&topic()), 0);
    }

    #[tokio::test]
    async fn test_panicking_callback_does_not_stop_delivery() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let callback: EventCallback = {
            let seen = Arc::clone(&seen);
            Arc::new(move |event| {
                let tag = tag_of(&event);
                if tag == 0 {
                    panic!("boom");
                }
                seen.lock().push(tag);
            })
        };
        registry.register(topic(), String::new(), callback);
        let bus = DispatchBus::new(Arc::clone(&registry), 16);

        bus.publish(&topic(), tagged(0));
        bus.publish(&topic(), tagged(1));

        wait_for(&seen, 1).await;
        assert_eq!(*seen.lock(), vec![1]);
    }

    #[tokio::test]
    async fn test_blocking_callback_does_not_hold_up_other_topics() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let slow_done = Arc::new(AtomicBool::new(false));
        let slow: EventCallback = {
            let slow_done = Arc::clone(&slow_done);
            Arc::new(move |_: StreamEvent| {
                std::thread::sleep(Duration::from_millis(500));
                slow_done.store(true, Ordering::SeqCst);
            })
        };
        let eth = Topic::order_book(CurrencyPair::new("ETH", "USDT"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        registry.register(eth.clone(), String::new(), slow);
        registry.register(topic(), String::new(), recording_callback(&seen));
        let bus = DispatchBus::new(Arc::clone(&registry), 16);

        bus.publish(&eth, tagged(0));
        bus.publish(&topic(), tagged(1));

        wait_for(&seen, 1).await;
        assert!(!slow_done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_publish_failure_reaches_every_topic() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let failures = Arc::new(AtomicU64::new(0));
        let counting: EventCallback = {
            let failures = Arc::clone(&failures);
            Arc::new(move |event| {
                if event.is_failure() {
                    failures.fetch_add(1, Ordering::SeqCst);
                }
            })
        };
        registry.register(topic(), String::new(), recording_callback(&seen));
        registry.register(
            Topic::order_book(CurrencyPair::new("ETH", "USDT")),
            String::new(),
            counting,
        );
        let bus = DispatchBus::new(Arc::clone(&registry), 16);

        bus.publish_failure("7");

        wait_for(&seen, 1).await;
        for _ in 0..200 {
            if failures.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(*seen.lock(), vec![7]);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }
}
