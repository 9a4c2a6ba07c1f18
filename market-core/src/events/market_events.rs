use crate::entities::{Kline, PriceLevel, Trade};
use crate::value_objects::{CurrencyPair, Price, Quantity, Side};

/// Exchange-neutral market event produced by a frame decoder
///
/// This is the only shape in which stream data crosses from an exchange
/// adapter into the synchronization engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalEvent {
    /// Full order book replacement
    Snapshot {
        pair: CurrencyPair,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    },
    /// Single-level upsert (quantity > 0) or delete (quantity == 0)
    Diff {
        pair: CurrencyPair,
        side: Side,
        price: Price,
        quantity: Quantity,
    },
    /// Trades printed since the previous batch
    TradeBatch {
        pair: CurrencyPair,
        trades: Vec<Trade>,
    },
    /// Latest state of the current candle
    KlineUpdate { pair: CurrencyPair, kline: Kline },
}

impl CanonicalEvent {
    pub fn pair(&self) -> &CurrencyPair {
        match self {
            CanonicalEvent::Snapshot { pair, .. }
            | CanonicalEvent::Diff { pair, .. }
            | CanonicalEvent::TradeBatch { pair, .. }
            | CanonicalEvent::KlineUpdate { pair, .. } => pair,
        }
    }

    /// Short event kind used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            CanonicalEvent::Snapshot { .. } => "snapshot",
            CanonicalEvent::Diff { .. } => "diff",
            CanonicalEvent::TradeBatch { .. } => "trades",
            CanonicalEvent::KlineUpdate { .. } => "kline",
        }
    }

    pub fn is_order_book(&self) -> bool {
        matches!(
            self,
            CanonicalEvent::Snapshot { .. } | CanonicalEvent::Diff { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_and_kind() {
        let pair = CurrencyPair::new("ETH", "USDT");
        let diff = CanonicalEvent::Diff {
            pair: pair.clone(),
            side: Side::Ask,
            price: Price::from_int(10),
            quantity: Quantity::ZERO,
        };
        assert_eq!(diff.pair(), &pair);
        assert_eq!(diff.kind(), "diff");
        assert!(diff.is_order_book());

        let trades = CanonicalEvent::TradeBatch {
            pair,
            trades: Vec::new(),
        };
        assert!(!trades.is_order_book());
    }
}
