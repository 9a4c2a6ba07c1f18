mod currency_pair;
mod error;
mod fixed;
mod kline_interval;
mod price;
mod quantity;
mod side;

pub use currency_pair::CurrencyPair;
pub use error::ValueError;
pub use kline_interval::KlineInterval;
pub use price::{PRICE_DECIMALS, PRICE_SCALE, Price};
pub use quantity::{QUANTITY_DECIMALS, QUANTITY_SCALE, Quantity};
pub use side::{Side, TradeSide};

/// Milliseconds since the Unix epoch, as reported by the exchange
pub type TimestampMs = i64;
