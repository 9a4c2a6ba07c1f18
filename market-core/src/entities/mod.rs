mod kline;
mod order_book;
mod price_level;
mod trade;

pub use kline::Kline;
pub use order_book::{FillError, LevelChange, OrderBook};
pub use price_level::PriceLevel;
pub use trade::Trade;
