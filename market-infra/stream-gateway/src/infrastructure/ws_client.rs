use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::domain::{Connector, Frame, FrameSink, FrameSource, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport for streaming market data
/// Infrastructure component - handles WebSocket communication
///
/// Pings are answered by tungstenite while reading; control frames never
/// reach the decoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        WsConnector
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        endpoint: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameSource>), TransportError> {
        let (ws_stream, response) = connect_async(endpoint).await.map_err(classify)?;
        tracing::debug!(endpoint, status = %response.status(), "WebSocket handshake complete");

        let (write, read) = ws_stream.split();
        Ok((Box::new(WsSink { write }), Box::new(WsSource { read })))
    }
}

struct WsSink {
    write: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let message = match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(bytes) => Message::Binary(bytes.into()),
        };
        self.write
            .send(message)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.write.close().await {
            tracing::trace!("Error closing websocket: {}", e);
        }
    }
}

struct WsSource {
    read: SplitStream<WsStream>,
}

#[async_trait]
impl FrameSource for WsSource {
    async fn next_frame(&mut self) -> Result<Frame, TransportError> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text.as_str().to_owned())),
                Some(Ok(Message::Binary(bytes))) => return Ok(Frame::Binary(bytes.to_vec())),
                Some(Ok(Message::Ping(data))) => {
                    tracing::trace!("Received ping: {:?}", data);
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!("Server closed websocket: {:?}", frame);
                    return Err(TransportError::Closed);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
                None => return Err(TransportError::Closed),
            }
        }
    }
}

/// Handshake failures that retrying cannot fix are terminal
fn classify(error: WsError) -> TransportError {
    match &error {
        WsError::Url(_) | WsError::HttpFormat(_) => TransportError::Rejected(error.to_string()),
        WsError::Http(response) if response.status().is_client_error() => {
            TransportError::Rejected(format!("HTTP {}", response.status()))
        }
        _ => TransportError::Connection(error.to_string()),
    }
}
