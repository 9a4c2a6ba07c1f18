use crate::value_objects::{CurrencyPair, KlineInterval, Price, Quantity, TimestampMs};
use serde::{Deserialize, Serialize};

/// One OHLCV candle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kline {
    pub pair: CurrencyPair,
    pub interval: KlineInterval,
    pub open_time: TimestampMs,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Quantity,
}

impl Kline {
    /// Close time of the candle (exclusive)
    pub fn close_time(&self) -> TimestampMs {
        self.open_time + (self.interval.seconds() as i64) * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_time() {
        let kline = Kline {
            pair: CurrencyPair::new("BTC", "USDT"),
            interval: KlineInterval::FiveMinutes,
            open_time: 1_000,
            open: Price::from_int(1),
            high: Price::from_int(2),
            low: Price::from_int(1),
            close: Price::from_int(2),
            volume: Quantity::from_int(10),
        };
        assert_eq!(kline.close_time(), 301_000);
    }
}
