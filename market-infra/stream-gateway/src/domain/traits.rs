use async_trait::async_trait;
use market_core::CanonicalEvent;

use super::error::{DecodeError, TransportError};
use super::topic::{Channel, Topic};

/// One websocket data frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Text(text) => text.as_bytes(),
            Frame::Binary(bytes) => bytes,
        }
    }
}

/// Write half of an open transport
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Best-effort close; errors are not interesting at this point
    async fn close(&mut self);
}

/// Read half of an open transport
#[async_trait]
pub trait FrameSource: Send {
    /// Next data frame. A closed stream yields `TransportError::Closed`.
    async fn next_frame(&mut self) -> Result<Frame, TransportError>;
}

/// Opens transports to an endpoint
///
/// Implements Dependency Inversion - the supervisor never names a concrete
/// websocket library.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameSource>), TransportError>;
}

/// Turns raw exchange frames into canonical events
///
/// A frame may carry no market data (acks, pongs) or several events (a
/// multi-level incremental depth update yields one `Diff` per level, in
/// frame order). Implementations must not block.
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, frame: &Frame) -> Result<Vec<CanonicalEvent>, DecodeError>;
}

/// Builds the exchange's wire subscribe request for a topic
pub trait SubscriptionEncoder: Send + Sync {
    fn subscribe_request(&self, topic: &Topic) -> Result<String, DecodeError>;
}

/// Everything exchange-specific the gateway needs
pub trait ExchangeProtocol: FrameDecoder + SubscriptionEncoder {
    fn name(&self) -> &str;

    /// Whether the exchange pushes this channel at all
    fn supports(&self, _channel: Channel) -> bool {
        true
    }
}
