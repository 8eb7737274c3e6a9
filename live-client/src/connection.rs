//! WebSocket connection ownership.
//!
//! The [`ConnectionManager`] owns the write half of the transport and the
//! connection state. The read half is handed to the session's receive loop
//! at connect time; when that loop observes a transport failure it re-dials
//! through the manager according to the [`ReconnectConfig`].

use crate::error::{LiveError, Result};
use crate::platform::PlatformAdapter;
use crate::wire::{self, ClientMessage};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

pub(crate) type WsStream =
    tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
pub(crate) type WsSource = SplitStream<WsStream>;

/// Connection lifecycle state. Transitions are monotonic within one
/// connection attempt: Disconnected → Connecting → Connected, then either
/// Reconnecting (transport failure with retries left) or Disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport.
    Disconnected,
    /// Dialing.
    Connecting,
    /// Transport open; sends are accepted.
    Connected,
    /// Transport lost; the session supervisor is re-dialing. Sends fail
    /// until the transport reports running again.
    Reconnecting,
}

/// Reconnect policy applied when the receive loop ends abnormally.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Whether to re-dial at all.
    pub enabled: bool,
    /// Maximum number of re-dial attempts per outage.
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self { enabled: true, max_attempts: 3, retry_delay_ms: 1000 }
    }
}

impl ReconnectConfig {
    /// Disable automatic reconnection.
    pub fn disabled() -> Self {
        Self { enabled: false, ..Default::default() }
    }

    /// Set the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the delay between attempts.
    pub fn with_retry_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_delay_ms = delay_ms;
        self
    }
}

/// Owns the transport: connects, sends, and closes gracefully.
pub struct ConnectionManager {
    adapter: Arc<dyn PlatformAdapter>,
    state: RwLock<ConnectionState>,
    sink: Mutex<Option<WsSink>>,
    reconnect: ReconnectConfig,
}

impl ConnectionManager {
    /// Create a manager around a platform adapter.
    pub fn new(adapter: Arc<dyn PlatformAdapter>, reconnect: ReconnectConfig) -> Self {
        Self {
            adapter,
            state: RwLock::new(ConnectionState::Disconnected),
            sink: Mutex::new(None),
            reconnect,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Whether sends are currently accepted.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Reconnect policy for this connection.
    pub fn reconnect_config(&self) -> &ReconnectConfig {
        &self.reconnect
    }

    /// Resolve URL and token through the adapter, open the transport, and
    /// store the write half. Returns the read half for the receive loop.
    pub async fn connect(&self) -> Result<WsSource> {
        {
            let mut state = self.state.write();
            match *state {
                ConnectionState::Connected | ConnectionState::Connecting => {
                    return Err(LiveError::connection("already connected"));
                }
                _ => *state = ConnectionState::Connecting,
            }
        }

        let url = self.adapter.live_url();
        let mut request = url.into_client_request().map_err(|e| {
            *self.state.write() = ConnectionState::Disconnected;
            LiveError::connection(format!("invalid live endpoint: {e}"))
        })?;

        if let Some(token) = self.adapter.access_token().await.inspect_err(|_| {
            *self.state.write() = ConnectionState::Disconnected;
        })? {
            let header = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| {
                    *self.state.write() = ConnectionState::Disconnected;
                    LiveError::connection(format!("invalid auth token header: {e}"))
                })?;
            request.headers_mut().insert(AUTHORIZATION, header);
        }

        let (stream, _response) = connect_async(request).await.map_err(|e| {
            *self.state.write() = ConnectionState::Disconnected;
            LiveError::connection(format!("WebSocket connect error: {e}"))
        })?;

        let (sink, source) = stream.split();
        *self.sink.lock().await = Some(sink);
        *self.state.write() = ConnectionState::Connected;
        info!("live transport open");
        Ok(source)
    }

    /// Encode and write one outbound envelope. Fails with
    /// [`LiveError::NotConnected`] unless the transport is running.
    pub async fn send(&self, msg: &ClientMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(LiveError::NotConnected);
        }
        let text = wire::encode(msg)?;
        debug!(len = text.len(), "sending frame");

        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(LiveError::NotConnected)?;
        sink.send(Message::Text(text)).await.map_err(|e| {
            LiveError::connection(format!("send error: {e}"))
        })
    }

    /// Mark the transport as lost while re-dialing.
    pub(crate) fn mark_reconnecting(&self) {
        *self.state.write() = ConnectionState::Reconnecting;
    }

    /// Mark the transport as gone for good.
    pub(crate) fn mark_disconnected(&self) {
        *self.state.write() = ConnectionState::Disconnected;
    }

    /// Gracefully close the transport. Every internal failure is caught and
    /// logged, never returned: this must be safe from teardown paths.
    /// Idempotent.
    pub async fn close(&self, reason: Option<String>) {
        *self.state.write() = ConnectionState::Disconnected;

        let mut guard = self.sink.lock().await;
        if let Some(mut sink) = guard.take() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: reason.unwrap_or_default().into(),
            };
            if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                warn!(error = %e, "graceful close failed");
            }
            if let Err(e) = sink.close().await {
                debug!(error = %e, "sink close failed");
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager").field("state", &self.state()).finish()
    }
}
