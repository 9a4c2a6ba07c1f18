use market_core::{CanonicalEvent, CurrencyPair, OrderBook};
use std::sync::Arc;

use crate::domain::{Channel, StreamEvent};
use crate::presentation::DispatchBus;

use super::reconciler::OrderBookReconciler;
use super::registry::SubscriptionRegistry;

/// Routes decoded events from the read loop to the reconciler and the bus.
///
/// Application layer - called synchronously for every canonical event, in
/// frame order. Never blocks: all consumer work happens on dispatch tasks.
pub struct MarketDataHandler {
    registry: Arc<SubscriptionRegistry>,
    reconciler: Arc<OrderBookReconciler>,
    bus: Arc<DispatchBus>,
}

impl MarketDataHandler {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        reconciler: Arc<OrderBookReconciler>,
        bus: Arc<DispatchBus>,
    ) -> Self {
        MarketDataHandler {
            registry,
            reconciler,
            bus,
        }
    }

    /// Handle one event. Returns how many topics it was published to.
    pub fn handle(&self, event: CanonicalEvent) -> usize {
        match event {
            CanonicalEvent::Snapshot { pair, bids, asks } => {
                if !self.tracks_book(&pair) {
                    tracing::trace!(pair = %pair, "Snapshot for unsubscribed pair ignored");
                    return 0;
                }
                let book = self.reconciler.apply_snapshot(&pair, bids, asks);
                self.publish_book(&pair, book)
            }
            CanonicalEvent::Diff {
                pair,
                side,
                price,
                quantity,
            } => {
                if !self.tracks_book(&pair) {
                    return 0;
                }
                match self.reconciler.apply_diff(&pair, side, price, quantity) {
                    Ok(outcome) => self.publish_book(&pair, outcome.book),
                    Err(e) => {
                        tracing::warn!(pair = %pair, %side, %price, "{}", e);
                        0
                    }
                }
            }
            CanonicalEvent::TradeBatch { pair, trades } => {
                if trades.is_empty() {
                    return 0;
                }
                let batch: Arc<[_]> = trades.into();
                self.registry
                    .topics_for(&pair, Channel::Trade)
                    .iter()
                    .filter(|topic| self.bus.publish(topic, StreamEvent::Trades(Arc::clone(&batch))))
                    .count()
            }
            CanonicalEvent::KlineUpdate { pair, kline } => self
                .registry
                .topics_for(&pair, Channel::Kline)
                .iter()
                .filter(|topic| topic.interval() == Some(kline.interval))
                .filter(|topic| self.bus.publish(topic, StreamEvent::Kline(kline.clone())))
                .count(),
        }
    }

    fn tracks_book(&self, pair: &CurrencyPair) -> bool {
        !self.registry.topics_for(pair, Channel::OrderBook).is_empty()
    }

    fn publish_book(&self, pair: &CurrencyPair, book: Arc<OrderBook>) -> usize {
        self.registry
            .topics_for(pair, Channel::OrderBook)
            .iter()
            .filter(|topic| self.bus.publish(topic, StreamEvent::OrderBook(Arc::clone(&book))))
            .count()
    }
}
