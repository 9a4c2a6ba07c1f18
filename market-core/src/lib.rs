//! Market Core
//!
//! Shared market-data domain types used by the stream gateway:
//! fixed-point prices and quantities, currency pairs, the sorted
//! two-sided `OrderBook`, trades, klines and the `CanonicalEvent`
//! that exchange decoders produce.

pub mod entities;
pub mod events;
pub mod value_objects;

// Re-export value objects at crate root for convenience
pub use value_objects::{
    CurrencyPair, KlineInterval, PRICE_DECIMALS, PRICE_SCALE, Price, QUANTITY_DECIMALS,
    QUANTITY_SCALE, Quantity, Side, TimestampMs, TradeSide, ValueError,
};

// Re-export entities at crate root
pub use entities::{FillError, Kline, LevelChange, OrderBook, PriceLevel, Trade};

// Re-export events at crate root
pub use events::CanonicalEvent;
