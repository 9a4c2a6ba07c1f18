use market_core::{CurrencyPair, KlineInterval, Price};
use std::fmt;

/// Kind of push channel a topic subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    OrderBook,
    Trade,
    Kline,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::OrderBook => "depth",
            Channel::Trade => "trades",
            Channel::Kline => "kline",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel-specific subscription parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelParams {
    None,
    /// Order book depth: number of levels and price precision
    Depth { levels: u32, precision: Price },
    /// Kline candle width
    Interval(KlineInterval),
}

/// Identifies one logical push stream: channel + pair + parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic {
    channel: Channel,
    pair: CurrencyPair,
    params: ChannelParams,
}

impl Topic {
    /// Order book topic with explicit depth parameters
    pub fn depth(pair: CurrencyPair, levels: u32, precision: Price) -> Self {
        Topic {
            channel: Channel::OrderBook,
            pair,
            params: ChannelParams::Depth { levels, precision },
        }
    }

    /// Order book topic with exchange-default depth
    pub fn order_book(pair: CurrencyPair) -> Self {
        Topic {
            channel: Channel::OrderBook,
            pair,
            params: ChannelParams::None,
        }
    }

    pub fn trades(pair: CurrencyPair) -> Self {
        Topic {
            channel: Channel::Trade,
            pair,
            params: ChannelParams::None,
        }
    }

    pub fn klines(pair: CurrencyPair, interval: KlineInterval) -> Self {
        Topic {
            channel: Channel::Kline,
            pair,
            params: ChannelParams::Interval(interval),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn pair(&self) -> &CurrencyPair {
        &self.pair
    }

    pub fn params(&self) -> &ChannelParams {
        &self.params
    }

    /// Kline interval, if this is a kline topic
    pub fn interval(&self) -> Option<KlineInterval> {
        match self.params {
            ChannelParams::Interval(interval) => Some(interval),
            _ => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.channel, self.pair.to_symbol("_"))?;
        match &self.params {
            ChannelParams::None => Ok(()),
            ChannelParams::Depth { levels, precision } => write!(f, "[{}@{}]", levels, precision),
            ChannelParams::Interval(interval) => write!(f, "[{}]", interval),
        }
    }
}

/// Handle returned by a subscribe call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub const fn new(id: u64) -> Self {
        SubscriptionId(id)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}
