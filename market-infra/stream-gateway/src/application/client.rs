//! Caller-facing streaming client
//!
//! One client per exchange endpoint. It owns the registry, reconciler,
//! dispatch bus and supervisor; nothing here is process-global.

use market_core::{CurrencyPair, KlineInterval, OrderBook};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

use crate::domain::{
    Channel, ConnectionState, Connector, EventCallback, ExchangeProtocol, FrameDecoder,
    StreamError, StreamEvent, SubscriptionId, Topic,
};
use crate::presentation::DispatchBus;

use super::config::ClientConfig;
use super::reconciler::OrderBookReconciler;
use super::registry::{ActiveSubscription, SubscriptionRegistry};
use super::supervisor::ConnectionSupervisor;

pub struct StreamClient {
    config: ClientConfig,
    protocol: Arc<dyn ExchangeProtocol>,
    registry: Arc<SubscriptionRegistry>,
    reconciler: Arc<OrderBookReconciler>,
    bus: Arc<DispatchBus>,
    supervisor: Arc<ConnectionSupervisor>,
    closed: AtomicBool,
}

impl StreamClient {
    /// Build a client. Nothing connects until the first subscribe.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new<P>(config: ClientConfig, connector: Arc<dyn Connector>, protocol: Arc<P>) -> Self
    where
        P: ExchangeProtocol + 'static,
    {
        let registry = Arc::new(SubscriptionRegistry::new());
        let reconciler = Arc::new(OrderBookReconciler::new());
        let bus = Arc::new(DispatchBus::new(Arc::clone(&registry), config.queue_capacity));

        let decoder: Arc<dyn FrameDecoder> = Arc::clone(&protocol) as Arc<dyn FrameDecoder>;
        let supervisor = ConnectionSupervisor::new(
            config.endpoint.clone(),
            config.retry.clone(),
            connector,
            decoder,
            Arc::clone(&registry),
            Arc::clone(&reconciler),
            Arc::clone(&bus),
        );

        tracing::debug!(exchange = protocol.name(), endpoint = %config.endpoint, "Stream client created");

        StreamClient {
            config,
            protocol,
            registry,
            reconciler,
            bus,
            supervisor,
            closed: AtomicBool::new(false),
        }
    }

    pub fn exchange(&self) -> &str {
        self.protocol.name()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether subscriptions on `channel` can be served by this exchange
    pub fn supports(&self, channel: Channel) -> bool {
        self.protocol.supports(channel)
    }

    /// Register a callback for `topic` and make sure the exchange is subscribed.
    ///
    /// Connects on first use. If already connected the payload is sent right
    /// away; otherwise it goes out with the replay once connected.
    /// Subscribing to an already registered topic swaps the callback and
    /// returns the existing handle.
    pub async fn subscribe<F>(
        &self,
        topic: Topic,
        payload: String,
        callback: F,
    ) -> Result<SubscriptionId, StreamError>
    where
        F: Fn(StreamEvent) + Send + Sync + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(StreamError::Closed);
        }

        let callback: EventCallback = Arc::new(callback);
        let registration = self.registry.register(topic.clone(), payload.clone(), callback);
        if !registration.is_new {
            return Ok(registration.id);
        }

        if self.supervisor.state().is_connected() {
            if let Err(e) = self.supervisor.send(payload).await {
                // Registered already, so the reconnect replay covers it
                tracing::warn!(topic = %topic, error = %e, "Subscribe request not sent, deferring to replay");
            }
        } else if let Err(e) = self.supervisor.connect().await {
            let _ = self.registry.unregister(registration.id);
            self.bus.close_topic(&topic);
            return Err(e);
        }

        tracing::info!(exchange = self.exchange(), topic = %topic, id = %registration.id, "Subscribed");
        Ok(registration.id)
    }

    /// Subscribe to the order book of `pair`, `levels` deep
    pub async fn subscribe_depth<F>(
        &self,
        pair: CurrencyPair,
        levels: u32,
        callback: F,
    ) -> Result<SubscriptionId, StreamError>
    where
        F: Fn(StreamEvent) + Send + Sync + 'static,
    {
        if levels == 0 {
            return Err(StreamError::InvalidTopic(format!(
                "depth subscription for {} needs at least one level",
                pair
            )));
        }
        let topic = Topic::depth(pair, levels, self.config.depth_precision);
        let payload = self.protocol.subscribe_request(&topic)?;
        self.subscribe(topic, payload, callback).await
    }

    pub async fn subscribe_trades<F>(
        &self,
        pair: CurrencyPair,
        callback: F,
    ) -> Result<SubscriptionId, StreamError>
    where
        F: Fn(StreamEvent) + Send + Sync + 'static,
    {
        let topic = Topic::trades(pair);
        let payload = self.protocol.subscribe_request(&topic)?;
        self.subscribe(topic, payload, callback).await
    }

    pub async fn subscribe_klines<F>(
        &self,
        pair: CurrencyPair,
        interval: KlineInterval,
        callback: F,
    ) -> Result<SubscriptionId, StreamError>
    where
        F: Fn(StreamEvent) + Send + Sync + 'static,
    {
        let topic = Topic::klines(pair, interval);
        let payload = self.protocol.subscribe_request(&topic)?;
        self.subscribe(topic, payload, callback).await
    }

    /// Stop delivery for a subscription.
    ///
    /// Once this returns the callback is not running and will not run again.
    /// No wire unsubscribe is sent.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), StreamError> {
        let topic = self.registry.unregister(id)?;
        self.bus.close_topic(&topic);

        if topic.channel() == Channel::OrderBook
            && self.registry.topics_for(topic.pair(), Channel::OrderBook).is_empty()
        {
            self.reconciler.remove(topic.pair());
        }

        tracing::info!(exchange = self.exchange(), topic = %topic, id = %id, "Unsubscribed");
        Ok(())
    }

    /// Latest consistent book for `pair`, or `None` until a snapshot is applied
    pub fn current_order_book(&self, pair: &CurrencyPair) -> Option<Arc<OrderBook>> {
        self.reconciler.current(pair)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.supervisor.state_changes()
    }

    pub fn active_subscriptions(&self) -> Vec<ActiveSubscription> {
        self.registry.all_active()
    }

    /// Drop every subscription and close the connection
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.supervisor.shutdown().await;
        for subscription in self.registry.all_active() {
            let _ = self.registry.unregister(subscription.id);
        }
        self.bus.close_all();
        self.reconciler.clear();

        tracing::info!(exchange = self.exchange(), "Stream client closed");
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.supervisor.abort_read_loop();
        self.bus.close_all();
    }
}
