//! Stream Gateway Crate
//!
//! Streaming market-data synchronization engine. Keeps one persistent
//! websocket connection per exchange alive, multiplexes many logical
//! subscriptions over it and rebuilds consistent order books from snapshot
//! and incremental updates.
//!
//! # Architecture
//!
//! The gateway:
//! - Registers subscriptions and replays them after every reconnect
//! - Reconnects with bounded exponential backoff, then fails loudly
//! - Decodes frames into canonical events on a single read loop
//! - Applies snapshots and diffs to per-pair books
//! - Delivers complete book views, trades and candles to callbacks through
//!   bounded per-topic queues
//!
//! ```text
//!   caller ── subscribe(topic, payload, callback) ──┐
//!                                                   ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                     StreamClient                          │
//! │  ┌──────────────────┐        ┌────────────────────────┐   │
//! │  │ SubscriptionReg. │◄───────│  ConnectionSupervisor  │◄──┼── WebSocket
//! │  │ (replay source)  │ replay │  retry / read loop     │   │
//! │  └────────┬─────────┘        └───────────┬────────────┘   │
//! │           │ callbacks                    │ CanonicalEvent │
//! │           │                              ▼                │
//! │           │                  ┌────────────────────────┐   │
//! │           │                  │   MarketDataHandler    │   │
//! │           │                  └─────┬─────────────┬────┘   │
//! │           │                        │ book events │ trades │
//! │           │                        ▼             │ klines │
//! │           │            ┌──────────────────────┐  │        │
//! │           │            │ OrderBookReconciler  │  │        │
//! │           │            └──────────┬───────────┘  │        │
//! │           │                       │ Arc<OrderBook>        │
//! │           ▼                       ▼             ▼         │
//! │  ┌────────────────────────────────────────────────────┐   │
//! │  │       DispatchBus (bounded queue + task/topic)     │   │
//! │  └────────────────────────────────────────────────────┘   │
//! └──────────────────────────────┬───────────────────────────┘
//!                                ▼
//!                         subscriber callbacks
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Re-export key types
pub use domain::{
    Channel, ChannelParams, ConnectionState, Connector, DecodeError, EventCallback,
    ExchangeProtocol, Frame, FrameDecoder, FrameSink, FrameSource, ReconcileError, StreamError,
    StreamEvent, SubscriptionEncoder, SubscriptionId, SyncStatus, Topic, TransportError,
};

pub use application::{
    ActiveSubscription, ClientConfig, ConnectionSupervisor, MarketDataHandler,
    OrderBookReconciler, RetryError, RetryPolicy, StreamClient, SubscriptionRegistry, retry,
};

pub use infrastructure::{CobinhoodProtocol, GateIoProtocol, WsConnector};

pub use presentation::{DEFAULT_QUEUE_CAPACITY, DispatchBus};

pub use config::{
    ConfigError, ExchangeConfig, ProtocolKind, StreamConfigFile, load_config, load_config_from_str,
    load_default_config,
};
