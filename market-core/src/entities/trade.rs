use crate::value_objects::{CurrencyPair, Price, Quantity, TimestampMs, TradeSide};
use serde::{Deserialize, Serialize};

/// A public trade printed by the exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub pair: CurrencyPair,
    pub trade_id: u64,
    pub side: TradeSide,
    pub price: Price,
    pub quantity: Quantity,
    pub timestamp: TimestampMs,
}
