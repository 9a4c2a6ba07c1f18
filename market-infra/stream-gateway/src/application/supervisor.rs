//! Connection Supervisor
//!
//! Owns the one streaming connection to an exchange endpoint: opens it
//! through the retry executor, runs the sequential read loop, serializes
//! writes and, when a read fails, reconnects and replays every registered
//! subscription. When the retry budget runs out the connection moves to
//! `Failed` and every subscriber is told.

use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;

use crate::domain::{
    ConnectionState, Connector, DecodeError, Frame, FrameDecoder, FrameSink, FrameSource,
    StreamError, TransportError,
};
use crate::presentation::DispatchBus;

use super::market_data_handler::MarketDataHandler;
use super::reconciler::OrderBookReconciler;
use super::registry::SubscriptionRegistry;
use super::retry::{RetryError, RetryPolicy, retry};

pub struct ConnectionSupervisor {
    endpoint: String,
    policy: RetryPolicy,
    connector: Arc<dyn Connector>,
    decoder: Arc<dyn FrameDecoder>,
    registry: Arc<SubscriptionRegistry>,
    reconciler: Arc<OrderBookReconciler>,
    bus: Arc<DispatchBus>,
    handler: MarketDataHandler,
    /// Write half; the lock is held for a single send only
    writer: AsyncMutex<Option<Box<dyn FrameSink>>>,
    /// Serializes connect() callers
    connect_lock: AsyncMutex<()>,
    state: watch::Sender<ConnectionState>,
    read_task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl ConnectionSupervisor {
    pub fn new(
        endpoint: impl Into<String>,
        policy: RetryPolicy,
        connector: Arc<dyn Connector>,
        decoder: Arc<dyn FrameDecoder>,
        registry: Arc<SubscriptionRegistry>,
        reconciler: Arc<OrderBookReconciler>,
        bus: Arc<DispatchBus>,
    ) -> Arc<Self> {
        let handler = MarketDataHandler::new(
            Arc::clone(&registry),
            Arc::clone(&reconciler),
            Arc::clone(&bus),
        );
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Arc::new(ConnectionSupervisor {
            endpoint: endpoint.into(),
            policy,
            connector,
            decoder,
            registry,
            reconciler,
            bus,
            handler,
            writer: AsyncMutex::new(None),
            connect_lock: AsyncMutex::new(()),
            state,
            read_task: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Open the connection and start the read loop.
    ///
    /// No-op while connected or (re)connecting. Fails fast once the
    /// connection has permanently failed.
    pub async fn connect(self: &Arc<Self>) -> Result<(), StreamError> {
        let _guard = self.connect_lock.lock().await;

        if self.closed.load(Ordering::Acquire) {
            return Err(StreamError::Closed);
        }

        match self.state() {
            ConnectionState::Connected
            | ConnectionState::Connecting
            | ConnectionState::Reconnecting => return Ok(()),
            ConnectionState::Failed => {
                return Err(StreamError::ConnectionFailed(format!(
                    "connection to {} has failed",
                    self.endpoint
                )));
            }
            ConnectionState::Disconnected => {}
        }

        self.set_state(ConnectionState::Connecting);

        let source = match self.open().await {
            Ok(source) => source,
            Err(e) => {
                // Every pending subscribe is waiting on this call and gets the error back
                self.enter_failed(&e).await;
                return Err(StreamError::ConnectionFailed(e.to_string()));
            }
        };

        if self.closed.load(Ordering::Acquire) {
            self.teardown_writer().await;
            self.set_state(ConnectionState::Disconnected);
            return Err(StreamError::Closed);
        }

        let supervisor = Arc::clone(self);
        let handle = tokio::spawn(async move { supervisor.read_loop(source).await });
        *self.read_task.lock() = Some(handle);

        Ok(())
    }

    /// Write one frame. At most one write is in flight at a time.
    pub async fn send(&self, payload: String) -> Result<(), StreamError> {
        if !self.state().is_connected() {
            return Err(StreamError::NotConnected);
        }

        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(StreamError::NotConnected)?;
        sink.send(Frame::Text(payload)).await?;
        Ok(())
    }

    /// Stop the read loop, close the transport and return to `Disconnected`
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.abort_read_loop();
        self.teardown_writer().await;
        self.set_state(ConnectionState::Disconnected);
        tracing::info!(endpoint = %self.endpoint, "Supervisor shut down");
    }

    /// Synchronous part of shutdown, usable from `Drop`
    pub fn abort_read_loop(&self) {
        if let Some(handle) = self.read_task.lock().take() {
            handle.abort();
        }
    }

    /// Connect with retry, install the writer, go `Connected` and replay
    async fn open(&self) -> Result<Box<dyn FrameSource>, TransportError> {
        let label = format!("connect {}", self.endpoint);
        let (sink, source) = retry(&self.policy, &label, || {
            let connector = Arc::clone(&self.connector);
            let endpoint = self.endpoint.clone();
            async move {
                connector.connect(&endpoint).await.map_err(|e| {
                    if e.is_terminal() {
                        RetryError::Terminal(e)
                    } else {
                        RetryError::Transient(e)
                    }
                })
            }
        })
        .await?;

        *self.writer.lock().await = Some(sink);
        self.set_state(ConnectionState::Connected);
        self.replay().await;

        Ok(source)
    }

    /// Re-send every registered subscribe request, in registration order
    async fn replay(&self) -> usize {
        let active = self.registry.all_active();
        let total = active.len();
        let mut sent = 0;

        for subscription in active {
            if let Err(e) = self.send(subscription.payload).await {
                // The read loop sees the broken transport and replays again
                tracing::warn!(
                    endpoint = %self.endpoint,
                    topic = %subscription.topic,
                    error = %e,
                    "Replay interrupted"
                );
                break;
            }
            sent += 1;
        }

        if total > 0 {
            tracing::info!(endpoint = %self.endpoint, sent, total, "Replayed subscriptions");
        }
        sent
    }

    async fn read_loop(self: Arc<Self>, mut source: Box<dyn FrameSource>) {
        tracing::debug!(endpoint = %self.endpoint, "Read loop started");

        loop {
            match source.next_frame().await {
                Ok(frame) => self.on_frame(&frame),
                Err(e) => {
                    tracing::warn!(endpoint = %self.endpoint, error = %e, "Connection lost");
                    match self.reconnect().await {
                        Ok(new_source) => source = new_source,
                        Err(e) => {
                            self.enter_failed(&e).await;
                            let reason = format!("connection to {} failed: {}", self.endpoint, e);
                            self.bus.publish_failure(&reason);
                            break;
                        }
                    }
                }
            }
        }

        tracing::debug!(endpoint = %self.endpoint, "Read loop stopped");
    }

    fn on_frame(&self, frame: &Frame) {
        let decoded = match catch_unwind(AssertUnwindSafe(|| self.decoder.decode(frame))) {
            Ok(decoded) => decoded,
            Err(_) => {
                tracing::error!(endpoint = %self.endpoint, "Decoder panicked, frame dropped");
                return;
            }
        };

        match decoded {
            Ok(events) => {
                for event in events {
                    tracing::trace!(kind = event.kind(), pair = %event.pair(), "Decoded event");
                    self.handler.handle(event);
                }
            }
            Err(DecodeError::UnknownChannel(channel)) => {
                tracing::debug!(endpoint = %self.endpoint, %channel, "Dropping frame for unknown channel");
            }
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Dropping undecodable frame");
            }
        }
    }

    async fn reconnect(&self) -> Result<Box<dyn FrameSource>, TransportError> {
        self.set_state(ConnectionState::Reconnecting);
        self.teardown_writer().await;

        let marked = self.reconciler.mark_all_out_of_sync();
        if marked > 0 {
            tracing::warn!(endpoint = %self.endpoint, books = marked, "Order books out of sync until fresh snapshots arrive");
        }

        self.open().await
    }

    /// Enter the terminal state; nothing reconnects after this
    async fn enter_failed(&self, error: &TransportError) {
        self.set_state(ConnectionState::Failed);
        self.teardown_writer().await;
        tracing::error!(endpoint = %self.endpoint, error = %error, subscriptions = self.registry.len(), "Retry budget exhausted, connection failed");
    }

    async fn teardown_writer(&self) {
        let sink = self.writer.lock().await.take();
        if let Some(mut sink) = sink {
            sink.close().await;
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::info!(endpoint = %self.endpoint, from = %previous, to = %state, "Connection state changed");
        }
    }
}
