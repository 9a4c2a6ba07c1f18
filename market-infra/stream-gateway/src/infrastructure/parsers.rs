use market_core::{
    CanonicalEvent, CurrencyPair, Kline, KlineInterval, Price, PriceLevel, Quantity, Side, Trade,
    TradeSide,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::debug;

use crate::domain::{
    Channel, ChannelParams, DecodeError, ExchangeProtocol, Frame, FrameDecoder, SubscriptionEncoder, Topic,
};

const DEFAULT_DEPTH_LEVELS: u32 = 30;
const DEFAULT_DEPTH_PRECISION: &str = "0.00000001";

// Fixed request ids, so a replayed request is byte-identical to the first
const DEPTH_REQUEST_ID: u64 = 1;
const TRADES_REQUEST_ID: u64 = 2;
const KLINE_REQUEST_ID: u64 = 10;

/// Envelope of every gate.io v3 websocket message
#[derive(Debug, Deserialize)]
struct WsMessage {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    error: Value,
}

#[derive(Debug, Deserialize)]
struct WsTrade {
    id: u64,
    time: f64,
    price: String,
    amount: String,
    #[serde(rename = "type")]
    side: String,
}

/// Decoder and subscribe encoder for the gate.io v3 websocket API
///
/// Infrastructure component - handles gate.io-format messages. Kline pushes
/// do not carry their interval, so the interval of the last kline subscribe
/// request built for a pair is remembered and stamped on its candles.
#[derive(Default)]
pub struct GateIoProtocol {
    kline_intervals: Mutex<HashMap<CurrencyPair, KlineInterval>>,
}

impl GateIoProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode_depth(&self, params: &Value) -> Result<Vec<CanonicalEvent>, DecodeError> {
        let (is_snapshot, book, symbol) = match params.as_array().map(Vec::as_slice) {
            Some([Value::Bool(flag), book, Value::String(symbol), ..]) => (*flag, book, symbol),
            _ => return Err(malformed("depth.update", params)),
        };
        let pair = CurrencyPair::parse(symbol)?;

        let asks = parse_levels(book.get("asks"))?;
        let bids = parse_levels(book.get("bids"))?;

        if is_snapshot {
            return Ok(vec![CanonicalEvent::Snapshot { pair, bids, asks }]);
        }

        let diffs = asks
            .into_iter()
            .map(|level| (Side::Ask, level))
            .chain(bids.into_iter().map(|level| (Side::Bid, level)))
            .map(|(side, level)| CanonicalEvent::Diff {
                pair: pair.clone(),
                side,
                price: level.price,
                quantity: level.quantity,
            })
            .collect();
        Ok(diffs)
    }

    fn decode_trades(&self, params: &Value) -> Result<Vec<CanonicalEvent>, DecodeError> {
        let (symbol, raw) = match params.as_array().map(Vec::as_slice) {
            Some([Value::String(symbol), raw, ..]) => (symbol, raw),
            _ => return Err(malformed("trades.update", params)),
        };
        let pair = CurrencyPair::parse(symbol)?;
        let raw: Vec<WsTrade> = serde_json::from_value(raw.clone())?;

        let trades = raw
            .into_iter()
            .map(|t| -> Result<Trade, DecodeError> {
                Ok(Trade {
                    pair: pair.clone(),
                    trade_id: t.id,
                    side: TradeSide::try_from(t.side.as_str())?,
                    price: Price::parse(&t.price)?,
                    quantity: Quantity::parse(&t.amount)?,
                    timestamp: (t.time * 1000.0) as i64,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(vec![CanonicalEvent::TradeBatch { pair, trades }])
    }

    /// `[[time, open, close, high, low, volume, amount, market], ...]`
    fn decode_kline(&self, params: &Value) -> Result<Vec<CanonicalEvent>, DecodeError> {
        let rows = params
            .as_array()
            .ok_or_else(|| malformed("kline.update", params))?;

        rows.iter()
            .map(|row| -> Result<CanonicalEvent, DecodeError> {
                let fields = match row.as_array().map(Vec::as_slice) {
                    Some(fields) if fields.len() >= 8 => fields,
                    _ => return Err(malformed("kline.update", row)),
                };
                let symbol = fields[7]
                    .as_str()
                    .ok_or_else(|| malformed("kline.update", row))?;
                let pair = CurrencyPair::parse(symbol)?;
                let interval = self
                    .kline_intervals
                    .lock()
                    .get(&pair)
                    .copied()
                    .unwrap_or(KlineInterval::OneMinute);
                let open_time = fields[0]
                    .as_i64()
                    .and_then(|secs| secs.checked_mul(1000))
                    .ok_or_else(|| malformed("kline.update", row))?;

                let kline = Kline {
                    pair: pair.clone(),
                    interval,
                    open_time,
                    open: Price::parse(text(&fields[1])?)?,
                    close: Price::parse(text(&fields[2])?)?,
                    high: Price::parse(text(&fields[3])?)?,
                    low: Price::parse(text(&fields[4])?)?,
                    volume: Quantity::parse(text(&fields[5])?)?,
                };
                Ok(CanonicalEvent::KlineUpdate { pair, kline })
            })
            .collect()
    }
}

impl FrameDecoder for GateIoProtocol {
    fn decode(&self, frame: &Frame) -> Result<Vec<CanonicalEvent>, DecodeError> {
        let message: WsMessage = serde_json::from_slice(frame.as_bytes())?;

        match message.method.as_deref() {
            Some("depth.update") => self.decode_depth(&message.params),
            Some("trades.update") => self.decode_trades(&message.params),
            Some("kline.update") => self.decode_kline(&message.params),
            Some(other) => Err(DecodeError::UnknownChannel(other.to_string())),
            None => {
                // Request responses and server.pong
                if !message.error.is_null() {
                    tracing::warn!(id = ?message.id, error = %message.error, "gate.io request failed");
                } else {
                    debug!(id = ?message.id, "gate.io response");
                }
                Ok(Vec::new())
            }
        }
    }
}

impl SubscriptionEncoder for GateIoProtocol {
    fn subscribe_request(&self, topic: &Topic) -> Result<String, DecodeError> {
        let symbol = topic.pair().to_symbol("_");

        let request = match topic.params() {
            ChannelParams::Depth { levels, precision } => json!({
                "id": DEPTH_REQUEST_ID,
                "method": "depth.subscribe",
                "params": [symbol, levels, precision.to_string()],
            }),
            ChannelParams::None if topic.channel() == Channel::OrderBook => json!({
                "id": DEPTH_REQUEST_ID,
                "method": "depth.subscribe",
                "params": [symbol, DEFAULT_DEPTH_LEVELS, DEFAULT_DEPTH_PRECISION],
            }),
            ChannelParams::None => json!({
                "id": TRADES_REQUEST_ID,
                "method": "trades.subscribe",
                "params": [symbol],
            }),
            ChannelParams::Interval(interval) => {
                self.kline_intervals
                    .lock()
                    .insert(topic.pair().clone(), *interval);
                json!({
                    "id": KLINE_REQUEST_ID,
                    "method": "kline.subscribe",
                    "params": [symbol, interval.seconds()],
                })
            }
        };

        Ok(request.to_string())
    }
}

impl ExchangeProtocol for GateIoProtocol {
    fn name(&self) -> &str {
        "gateio"
    }
}

fn parse_levels(value: Option<&Value>) -> Result<Vec<PriceLevel>, DecodeError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let rows = value
        .as_array()
        .ok_or_else(|| malformed("price levels", value))?;

    rows.iter()
        .map(|row| -> Result<PriceLevel, DecodeError> {
            match row.as_array().map(Vec::as_slice) {
                Some([price, amount, ..]) => Ok(PriceLevel::parse(text(price)?, text(amount)?)?),
                _ => Err(malformed("price level", row)),
            }
        })
        .collect()
}

fn text(value: &Value) -> Result<&str, DecodeError> {
    value
        .as_str()
        .ok_or_else(|| DecodeError::Malformed(format!("expected string, got {}", value)))
}

fn malformed(what: &str, value: &Value) -> DecodeError {
    debug!(what, data = %value, "gate.io: missing or invalid fields");
    DecodeError::Malformed(format!("{}: {}", what, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: Value) -> Frame {
        Frame::Text(value.to_string())
    }

    fn btc() -> CurrencyPair {
        CurrencyPair::new("BTC", "USDT")
    }

    #[test]
    fn test_depth_snapshot() {
        let protocol = GateIoProtocol::new();
        let events = protocol
            .decode(&frame(json!({
                "method": "depth.update",
                "params": [true, {
                    "asks": [["8000.00", "9.6250"]],
                    "bids": [["7990.00", "0.2"], ["7980.00", "1"]]
                }, "BTC_USDT"],
                "id": null
            })))
            .unwrap();

        assert_eq!(
            events,
            vec![CanonicalEvent::Snapshot {
                pair: btc(),
                bids: vec![
                    PriceLevel::parse("7990", "0.2").unwrap(),
                    PriceLevel::parse("7980", "1").unwrap()
                ],
                asks: vec![PriceLevel::parse("8000", "9.625").unwrap()],
            }]
        );
    }

    #[test]
    fn test_depth_update_yields_one_diff_per_level() {
        let protocol = GateIoProtocol::new();
        let events = protocol
            .decode(&frame(json!({
                "method": "depth.update",
                "params": [false, {
                    "asks": [["8000.00", "0"]],
                    "bids": [["7990.00", "1.5"]]
                }, "BTC_USDT"]
            })))
            .unwrap();

        assert_eq!(
            events,
            vec![
                CanonicalEvent::Diff {
                    pair: btc(),
                    side: Side::Ask,
                    price: Price::from_int(8000),
                    quantity: Quantity::ZERO,
                },
                CanonicalEvent::Diff {
                    pair: btc(),
                    side: Side::Bid,
                    price: Price::from_int(7990),
                    quantity: Quantity::parse("1.5").unwrap(),
                },
            ]
        );
    }

    #[test]
    fn test_trades_update() {
        let protocol = GateIoProtocol::new();
        let events = protocol
            .decode(&frame(json!({
                "method": "trades.update",
                "params": ["ETH_USDT", [
                    {"id": 7172173, "time": 1523339279.761838, "price": "398.59", "amount": "0.027", "type": "buy"}
                ]]
            })))
            .unwrap();

        let CanonicalEvent::TradeBatch { pair, trades } = &events[0] else {
            panic!("expected trade batch, got {:?}", events);
        };
        assert_eq!(pair, &CurrencyPair::new("ETH", "USDT"));
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].trade_id, 7172173);
        assert_eq!(trades[0].side, TradeSide::Buy);
        assert_eq!(trades[0].price, Price::parse("398.59").unwrap());
        assert_eq!(trades[0].timestamp, 1523339279761);
    }

    #[test]
    fn test_kline_uses_subscribed_interval() {
        let protocol = GateIoProtocol::new();
        let update = json!({
            "method": "kline.update",
            "params": [[1492358400, "7000.00", "8000.0", "8100.00", "6800.00", "1000.00", "123456.00", "BTC_USDT"]]
        });

        let events = protocol.decode(&frame(update.clone())).unwrap();
        let CanonicalEvent::KlineUpdate { kline, .. } = &events[0] else {
            panic!("expected kline");
        };
        assert_eq!(kline.interval, KlineInterval::OneMinute);
        assert_eq!(kline.open_time, 1492358400000);
        assert_eq!(kline.close, Price::from_int(8000));
        assert_eq!(kline.high, Price::from_int(8100));

        protocol
            .subscribe_request(&Topic::klines(btc(), KlineInterval::OneHour))
            .unwrap();
        let events = protocol.decode(&frame(update)).unwrap();
        let CanonicalEvent::KlineUpdate { kline, .. } = &events[0] else {
            panic!("expected kline");
        };
        assert_eq!(kline.interval, KlineInterval::OneHour);
    }

    #[test]
    fn test_kline_time_out_of_range_is_malformed() {
        let protocol = GateIoProtocol::new();
        let result = protocol.decode(&frame(json!({
            "method": "kline.update",
            "params": [[i64::MAX, "1", "1", "1", "1", "1", "1", "BTC_USDT"]]
        })));
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_responses_carry_no_events() {
        let protocol = GateIoProtocol::new();
        let ack = json!({"error": null, "result": {"status": "success"}, "id": 1});
        let pong = json!({"error": null, "result": "pong", "id": 5});
        let failed = json!({"error": {"code": 1, "message": "invalid argument"}, "result": null, "id": 2});

        assert!(protocol.decode(&frame(ack)).unwrap().is_empty());
        assert!(protocol.decode(&frame(pong)).unwrap().is_empty());
        assert!(protocol.decode(&frame(failed)).unwrap().is_empty());
    }

    #[test]
    fn test_decode_errors() {
        let protocol = GateIoProtocol::new();

        let unknown = protocol.decode(&frame(json!({"method": "ticker.update", "params": []})));
        assert!(matches!(unknown, Err(DecodeError::UnknownChannel(m)) if m == "ticker.update"));

        let garbage = protocol.decode(&Frame::Text("not json".into()));
        assert!(matches!(garbage, Err(DecodeError::Json(_))));

        let broken = protocol.decode(&frame(json!({"method": "depth.update", "params": [true]})));
        assert!(matches!(broken, Err(DecodeError::Malformed(_))));

        let negative = protocol.decode(&frame(json!({
            "method": "depth.update",
            "params": [false, {"bids": [["-1", "1"]]}, "BTC_USDT"]
        })));
        assert!(matches!(negative, Err(DecodeError::Value(_))));
    }

    #[test]
    fn test_subscribe_payloads() {
        let protocol = GateIoProtocol::new();

        assert_eq!(
            protocol
                .subscribe_request(&Topic::depth(btc(), 30, Price::from_raw(1)))
                .unwrap(),
            r#"{"id":1,"method":"depth.subscribe","params":["BTC_USDT",30,"0.00000001"]}"#
        );
        assert_eq!(
            protocol.subscribe_request(&Topic::order_book(btc())).unwrap(),
            r#"{"id":1,"method":"depth.subscribe","params":["BTC_USDT",30,"0.00000001"]}"#
        );
        assert_eq!(
            protocol.subscribe_request(&Topic::trades(btc())).unwrap(),
            r#"{"id":2,"method":"trades.subscribe","params":["BTC_USDT"]}"#
        );
        assert_eq!(
            protocol
                .subscribe_request(&Topic::klines(btc(), KlineInterval::OneMinute))
                .unwrap(),
            r#"{"id":10,"method":"kline.subscribe","params":["BTC_USDT",60]}"#
        );
    }
}
