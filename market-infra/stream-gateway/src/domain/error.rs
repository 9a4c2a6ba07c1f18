//! Error types for the stream gateway

use market_core::{CurrencyPair, ValueError};
use thiserror::Error;

use super::topic::SubscriptionId;

/// Transport-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Could not open the connection; worth retrying
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The endpoint refused us in a way retrying will not fix
    #[error("Connection rejected: {0}")]
    Rejected(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Connection closed")]
    Closed,
}

impl TransportError {
    /// Terminal errors abort the retry loop immediately
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransportError::Rejected(_))
    }
}

/// Frame decoding and subscribe-request encoding errors
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Invalid value: {0}")]
    Value(#[from] ValueError),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Order book reconciliation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Diff arrived with no trusted snapshot for the pair
    #[error("Order book for {0} is not synced; diff dropped")]
    Desync(CurrencyPair),
}

/// Caller-facing errors
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Not connected")]
    NotConnected,

    #[error("Connection failed permanently: {0}")]
    ConnectionFailed(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Unknown subscription: {0}")]
    UnknownSubscription(SubscriptionId),

    #[error("Could not build subscribe request: {0}")]
    Encode(#[from] DecodeError),

    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    #[error("Client is closed")]
    Closed,
}
