use market_core::{Kline, OrderBook, Trade};
use std::sync::Arc;

/// Event delivered to a subscriber callback
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Complete, consistent view of a pair's order book after an update
    OrderBook(Arc<OrderBook>),
    /// Batch of public trades
    Trades(Arc<[Trade]>),
    /// Current candle
    Kline(Kline),
    /// The connection failed permanently; no further market events will arrive
    ConnectionFailed(Arc<str>),
}

impl StreamEvent {
    pub fn is_failure(&self) -> bool {
        matches!(self, StreamEvent::ConnectionFailed(_))
    }
}

/// Subscriber callback; invoked from a dispatch task, never from the read loop
pub type EventCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;
