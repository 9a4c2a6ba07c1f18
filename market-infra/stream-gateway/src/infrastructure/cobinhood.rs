use market_core::{CanonicalEvent, CurrencyPair, Price, PriceLevel};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, trace, warn};

use crate::domain::{
    Channel, ChannelParams, DecodeError, ExchangeProtocol, Frame, FrameDecoder, SubscriptionEncoder, Topic,
};

/// Precision cobinhood offers for every pair
const DEFAULT_PRECISION: &str = "1E-7";

/// `{"h": [channel, version, kind, ...], "d": payload}`
#[derive(Debug, Deserialize)]
struct WsMessage {
    #[serde(rename = "h", default)]
    header: Vec<String>,
    #[serde(rename = "d", default)]
    data: Value,
}

#[derive(Debug, Default, Deserialize)]
struct WsDepth {
    #[serde(default)]
    bids: Vec<Vec<String>>,
    #[serde(default)]
    asks: Vec<Vec<String>>,
}

/// Decoder and subscribe encoder for the cobinhood v2 websocket API
///
/// Only full order book snapshots are decoded. Incremental `u` pushes are
/// skipped, so a book refreshes with each snapshot the server sends.
#[derive(Debug, Default, Clone, Copy)]
pub struct CobinhoodProtocol;

impl CobinhoodProtocol {
    pub fn new() -> Self {
        CobinhoodProtocol
    }

    fn decode_order_book(&self, channel: &str, kind: &str, data: Value) -> Result<Vec<CanonicalEvent>, DecodeError> {
        if kind != "s" {
            trace!(channel, kind, "cobinhood: order book update skipped");
            return Ok(Vec::new());
        }

        // order-book.COB-ETH.1E-7
        let symbol = channel
            .split('.')
            .nth(1)
            .ok_or_else(|| DecodeError::Malformed(format!("order book channel {}", channel)))?;
        let pair = CurrencyPair::parse(symbol)?;
        let depth: WsDepth = serde_json::from_value(data)?;

        Ok(vec![CanonicalEvent::Snapshot {
            pair,
            bids: parse_levels(&depth.bids)?,
            asks: parse_levels(&depth.asks)?,
        }])
    }
}

impl FrameDecoder for CobinhoodProtocol {
    fn decode(&self, frame: &Frame) -> Result<Vec<CanonicalEvent>, DecodeError> {
        let message: WsMessage = serde_json::from_slice(frame.as_bytes())?;
        let (channel, kind) = match message.header.as_slice() {
            [channel, _, kind, ..] => (channel.as_str(), kind.as_str()),
            _ => return Err(DecodeError::Malformed(format!("header {:?}", message.header))),
        };

        match kind {
            "error" => {
                warn!(header = ?message.header, "cobinhood request failed");
                return Ok(Vec::new());
            }
            "subscribed" | "unsubscribed" | "pong" => {
                debug!(channel, kind, "cobinhood response");
                return Ok(Vec::new());
            }
            _ => {}
        }

        match channel.split('.').next() {
            Some("order-book") => self.decode_order_book(channel, kind, message.data),
            _ => Err(DecodeError::UnknownChannel(channel.to_string())),
        }
    }
}

impl SubscriptionEncoder for CobinhoodProtocol {
    fn subscribe_request(&self, topic: &Topic) -> Result<String, DecodeError> {
        let precision = match topic.params() {
            ChannelParams::Depth { precision, .. } => scientific(*precision),
            ChannelParams::None if topic.channel() == Channel::OrderBook => DEFAULT_PRECISION.to_string(),
            _ => {
                return Err(DecodeError::Unsupported(format!(
                    "cobinhood does not stream {}",
                    topic.channel()
                )));
            }
        };

        let request = json!({
            "action": "subscribe",
            "type": "order-book",
            "trading_pair_id": topic.pair().to_symbol("-"),
            "precision": precision,
        });
        Ok(request.to_string())
    }
}

impl ExchangeProtocol for CobinhoodProtocol {
    fn name(&self) -> &str {
        "cobinhood"
    }

    fn supports(&self, channel: Channel) -> bool {
        channel == Channel::OrderBook
    }
}

/// `[price, order count, size]`
fn parse_levels(rows: &[Vec<String>]) -> Result<Vec<PriceLevel>, DecodeError> {
    rows.iter()
        .map(|row| -> Result<PriceLevel, DecodeError> {
            match row.as_slice() {
                [price, _, size, ..] => Ok(PriceLevel::parse(price, size)?),
                _ => Err(DecodeError::Malformed(format!("price level {:?}", row))),
            }
        })
        .collect()
}

/// Precision in cobinhood's notation: 0.0000001 -> `1E-7`, 0.0000005 -> `5E-7`
fn scientific(precision: Price) -> String {
    let mut mantissa = precision.raw();
    if mantissa <= 0 {
        return DEFAULT_PRECISION.to_string();
    }

    let mut exponent = -i32::from(Price::DECIMALS);
    while mantissa % 10 == 0 {
        mantissa /= 10;
        exponent += 1;
    }
    format!("{}E{}", mantissa, exponent)
}
