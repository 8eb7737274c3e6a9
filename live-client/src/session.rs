//! Live session façade.
//!
//! [`LiveSession`] composes the connection manager, inbound dispatcher,
//! audio accumulator, and tool dispatcher behind a small API:
//! connect/disconnect, the typed event stream, and the outbound send
//! operations.

use crate::audio::AudioChunk;
use crate::config::{DEFAULT_MODEL, SessionConfig, ToolDefinition};
use crate::connection::{ConnectionManager, ConnectionState, ReconnectConfig, WsSource};
use crate::dispatch::InboundDispatcher;
use crate::error::{LiveError, Result};
use crate::events::LiveEvent;
use crate::platform::PlatformAdapter;
use crate::tool::{LiveTool, ToolDispatcher, UnmatchedCallPolicy};
use crate::wire::{
    ClientContent, ClientMessage, Content, FunctionResponse, MediaChunk, RealtimeInput,
    ToolResponsePayload,
};
use base64::prelude::*;
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Builder for [`LiveSession`].
pub struct LiveSessionBuilder {
    adapter: Arc<dyn PlatformAdapter>,
    config: SessionConfig,
    tools: ToolDispatcher,
    reconnect: ReconnectConfig,
    event_capacity: usize,
}

impl LiveSessionBuilder {
    fn new(adapter: Arc<dyn PlatformAdapter>) -> Self {
        Self {
            adapter,
            config: SessionConfig::default(),
            tools: ToolDispatcher::new(),
            reconnect: ReconnectConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Set the session configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a tool: its declaration goes into the setup envelope, the
    /// implementation into the dispatcher.
    pub fn tool(mut self, definition: ToolDefinition, tool: Arc<dyn LiveTool>) -> Self {
        self.config = self.config.with_tool(definition);
        self.tools.register(tool);
        self
    }

    /// Set the policy for unmatched or failed tool calls.
    pub fn tool_policy(mut self, policy: UnmatchedCallPolicy) -> Self {
        self.tools = self.tools.with_policy(policy);
        self
    }

    /// Set the reconnect policy.
    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Set the event channel capacity (back-pressure bound).
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Build the session (does not connect yet).
    pub fn build(self) -> LiveSession {
        LiveSession {
            id: uuid::Uuid::new_v4().to_string(),
            adapter: Arc::clone(&self.adapter),
            config: self.config,
            conn: Arc::new(ConnectionManager::new(self.adapter, self.reconnect)),
            tools: Arc::new(self.tools),
            tasks: TaskTracker::new(),
            cancel: CancellationToken::new(),
            recv_task: Mutex::new(None),
            closed: AtomicBool::new(false),
            event_capacity: self.event_capacity,
        }
    }
}

/// A long-lived bidirectional conversation with a live model.
///
/// One session covers one conversation: create, connect, exchange turns,
/// disconnect. Events arrive on the receiver returned by
/// [`connect`](Self::connect).
///
/// # Example
///
/// ```rust,ignore
/// use gemini_live_client::{ApiKeyAdapter, LiveEvent, LiveSession, SessionConfig};
///
/// let session = LiveSession::builder(Arc::new(ApiKeyAdapter::new(api_key)))
///     .config(SessionConfig::new().with_model("models/gemini-2.0-flash-live-001"))
///     .build();
///
/// let mut events = session.connect(true).await?;
/// session.send_text("Hello!").await?;
/// while let Some(event) = events.recv().await {
///     match event {
///         LiveEvent::TextChunk { text, .. } => print!("{text}"),
///         LiveEvent::Closed => break,
///         _ => {}
///     }
/// }
/// session.disconnect().await;
/// ```
pub struct LiveSession {
    id: String,
    adapter: Arc<dyn PlatformAdapter>,
    config: SessionConfig,
    conn: Arc<ConnectionManager>,
    tools: Arc<ToolDispatcher>,
    tasks: TaskTracker,
    cancel: CancellationToken,
    recv_task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    event_capacity: usize,
}

impl LiveSession {
    /// Create a builder around a platform adapter.
    pub fn builder(adapter: Arc<dyn PlatformAdapter>) -> LiveSessionBuilder {
        LiveSessionBuilder::new(adapter)
    }

    /// Session ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    /// Whether sends are currently accepted.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Token cancelling all background work for this session. Cancelling it
    /// aborts an in-flight [`connect`](Self::connect) before `Connected`
    /// fires and stops the receive loop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Open the transport and start the receive loop. Returns the event
    /// receiver; `Connected` is always its first event.
    ///
    /// With `auto_send_setup`, the setup envelope is sent before this
    /// returns. After a transparent reconnect setup is NOT resent: a second
    /// `Connected` event marks the fresh session boundary and the caller
    /// re-runs its handshake.
    pub async fn connect(&self, auto_send_setup: bool) -> Result<mpsc::Receiver<LiveEvent>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(LiveError::SessionClosed);
        }

        let source = tokio::select! {
            _ = self.cancel.cancelled() => {
                // The dropped connect future may have left the state at
                // Connecting; put it back.
                self.conn.mark_disconnected();
                return Err(LiveError::SessionClosed);
            }
            result = self.conn.connect() => result?,
        };

        let (tx, rx) = mpsc::channel(self.event_capacity);
        if tx.send(LiveEvent::Connected).await.is_err() {
            return Err(LiveError::connection("event channel closed"));
        }

        let dispatcher = InboundDispatcher::new(
            Arc::clone(&self.tools),
            Arc::clone(&self.conn),
            tx.clone(),
            self.tasks.clone(),
            self.cancel.clone(),
        );
        let handle = tokio::spawn(receive_loop(
            source,
            dispatcher,
            Arc::clone(&self.conn),
            tx,
            self.cancel.clone(),
        ));
        *self.recv_task.lock().await = Some(handle);

        if auto_send_setup {
            self.send_setup().await?;
        }

        info!(session_id = %self.id, "live session connected");
        Ok(rx)
    }

    /// Send the setup envelope for this session's configuration.
    ///
    /// The model id is resolved through the platform adapter and must be
    /// namespaced; validation failures are returned before any write.
    pub async fn send_setup(&self) -> Result<()> {
        let model = self
            .adapter
            .resolve_model(self.config.model.as_deref().unwrap_or(DEFAULT_MODEL));
        let setup = self.config.to_setup(&model)?;
        debug!(model = %model, "sending setup");
        self.conn.send(&ClientMessage::setup(setup)).await
    }

    /// Send a complete user text turn.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        let content =
            ClientContent { turns: vec![Content::user_text(text)], turn_complete: true };
        self.conn.send(&ClientMessage::client_content(content)).await
    }

    /// Send raw audio bytes as realtime input, e.g. with MIME
    /// `audio/pcm;rate=16000`.
    pub async fn send_audio(&self, data: &[u8], mime_type: &str) -> Result<()> {
        let input = RealtimeInput {
            media_chunks: vec![MediaChunk {
                mime_type: mime_type.to_string(),
                data: BASE64_STANDARD.encode(data),
            }],
        };
        self.conn.send(&ClientMessage::realtime_input(input)).await
    }

    /// Send an audio chunk, deriving the MIME type from its format.
    pub async fn send_audio_chunk(&self, chunk: &AudioChunk) -> Result<()> {
        self.send_audio(&chunk.data, &chunk.format.mime_type()).await
    }

    /// Send function responses produced outside the registered tools. An
    /// empty batch sends nothing.
    pub async fn send_tool_response(&self, responses: Vec<FunctionResponse>) -> Result<()> {
        if responses.is_empty() {
            debug!("empty tool response batch, nothing to send");
            return Ok(());
        }
        let payload = ToolResponsePayload { function_responses: responses };
        self.conn.send(&ClientMessage::tool_response(payload)).await
    }

    /// Close the session: stop the receive loop, cancel and join tool
    /// tasks, and close the transport gracefully. Idempotent; all internal
    /// failures are swallowed so this is safe from teardown paths.
    pub async fn disconnect(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(session_id = %self.id, "disconnecting live session");

        self.cancel.cancel();
        self.tasks.close();
        self.conn.close(None).await;

        if let Some(handle) = self.recv_task.lock().await.take() {
            if let Err(e) = handle.await {
                debug!(error = %e, "receive loop join failed");
            }
        }
        self.tasks.wait().await;
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        // Synchronous teardown path: stop background work; the graceful
        // close already happened if the caller disconnected.
        self.cancel.cancel();
        self.tasks.close();
    }
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("id", &self.id)
            .field("state", &self.conn.state())
            .finish()
    }
}

/// Single ordered receive path. Reads frames, feeds the dispatcher, and
/// re-dials through the connection manager when the transport drops.
async fn receive_loop(
    mut source: WsSource,
    mut dispatcher: InboundDispatcher,
    conn: Arc<ConnectionManager>,
    events: mpsc::Sender<LiveEvent>,
    cancel: CancellationToken,
) {
    'session: loop {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break 'session,
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        dispatcher.dispatch_frame(text.as_bytes()).await;
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        dispatcher.dispatch_frame(&bytes).await;
                    }
                    // A clean close is a deliberate end of the session
                    // (e.g. after GoAway); only abnormal endings re-dial.
                    Some(Ok(Message::Close(frame))) => {
                        info!(close_frame = ?frame, "server closed the stream");
                        break 'session;
                    }
                    // Ping/pong are answered by the transport.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        let err = LiveError::connection(format!("receive error: {e}"));
                        warn!(error = %err, "transport failure on receive path");
                        if events.send(LiveEvent::Error(Arc::new(err))).await.is_err() {
                            debug!("event receiver dropped");
                        }
                        break;
                    }
                    None => break,
                }
            }
        }

        // Transport lost. Re-dial if the policy allows; setup is not
        // resent — the consumer sees a fresh Connected boundary.
        let reconnect = conn.reconnect_config().clone();
        if !reconnect.enabled {
            break 'session;
        }
        conn.mark_reconnecting();

        let mut reconnected = false;
        for attempt in 1..=reconnect.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => break 'session,
                _ = tokio::time::sleep(Duration::from_millis(reconnect.retry_delay_ms)) => {}
            }
            info!(attempt, max = reconnect.max_attempts, "re-dialing live transport");
            match conn.connect().await {
                Ok(new_source) => {
                    source = new_source;
                    reconnected = true;
                    if events.send(LiveEvent::Connected).await.is_err() {
                        debug!("event receiver dropped");
                    }
                    break;
                }
                Err(e) => {
                    warn!(error = %e, attempt, "reconnect attempt failed");
                    // connect() left the state Disconnected; keep signalling
                    // that a retry is in flight.
                    conn.mark_reconnecting();
                }
            }
        }
        if !reconnected {
            warn!("reconnect attempts exhausted");
            break 'session;
        }
    }

    conn.mark_disconnected();
    if events.send(LiveEvent::Closed).await.is_err() {
        debug!("event receiver dropped");
    }
}
