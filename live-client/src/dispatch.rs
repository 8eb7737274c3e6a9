//! Inbound message demultiplexing.
//!
//! Every decoded envelope fans out to tool dispatch, text/audio assembly,
//! turn control, transcription, and session-control events. The checks are
//! independent: one envelope may produce several events. A failure anywhere
//! in decode or dispatch drops that frame and leaves the receive loop
//! running.

use crate::audio::AudioAccumulator;
use crate::connection::ConnectionManager;
use crate::events::LiveEvent;
use crate::tool::ToolDispatcher;
use crate::wire::{self, ClientMessage, ServerMessage};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Demultiplexes inbound envelopes into [`LiveEvent`]s.
///
/// Owned by the receive loop; the audio accumulator inside is mutated only
/// from that single path.
pub(crate) struct InboundDispatcher {
    accumulator: AudioAccumulator,
    tools: Arc<ToolDispatcher>,
    conn: Arc<ConnectionManager>,
    events: mpsc::Sender<LiveEvent>,
    tasks: TaskTracker,
    cancel: CancellationToken,
}

impl InboundDispatcher {
    pub(crate) fn new(
        tools: Arc<ToolDispatcher>,
        conn: Arc<ConnectionManager>,
        events: mpsc::Sender<LiveEvent>,
        tasks: TaskTracker,
        cancel: CancellationToken,
    ) -> Self {
        Self { accumulator: AudioAccumulator::new(), tools, conn, events, tasks, cancel }
    }

    /// Decode and dispatch one raw frame. A malformed frame is logged and
    /// dropped; it never closes the connection or reaches the consumer.
    pub(crate) async fn dispatch_frame(&mut self, payload: &[u8]) {
        match wire::decode(payload) {
            Ok((msg, raw)) => self.dispatch(msg, raw).await,
            Err(e) => warn!(error = %e, "dropping undecodable frame"),
        }
    }

    /// Fan one envelope out to events. The checks below run independently,
    /// not as mutually exclusive branches.
    pub(crate) async fn dispatch(&mut self, msg: ServerMessage, raw: Value) {
        if msg.setup_complete.is_some() {
            self.emit(LiveEvent::SetupComplete).await;
        }

        // Tool calls run on the supervised task set so further frames are
        // never blocked behind tool execution.
        if let Some(tool_call) = msg.tool_call {
            if !tool_call.function_calls.is_empty() {
                let tools = Arc::clone(&self.tools);
                let conn = Arc::clone(&self.conn);
                let cancel = self.cancel.child_token();
                self.tasks.spawn(async move {
                    let Some(payload) =
                        tools.dispatch(&tool_call.function_calls, &cancel).await
                    else {
                        return;
                    };
                    if let Err(e) = conn.send(&ClientMessage::tool_response(payload)).await {
                        warn!(error = %e, "failed to send tool response");
                    }
                });
            }
        }

        if let Some(content) = msg.server_content {
            let turn_complete = content.turn_complete;

            if let Some(turn) = content.model_turn {
                for part in turn.parts {
                    if let Some(text) = part.text {
                        self.emit(LiveEvent::TextChunk { text, turn_complete }).await;
                    }
                    if let Some(inline) = part.inline_data {
                        if inline.mime_type.starts_with("audio") {
                            if let Err(e) =
                                self.accumulator.append_base64(&inline.data, &inline.mime_type)
                            {
                                warn!(error = %e, "dropping bad audio part");
                            }
                        }
                    }
                }
            }

            // The buffer is cleared exactly once per turn: an interrupted
            // turn is discarded, never flushed.
            if content.interrupted {
                self.accumulator.discard();
                self.emit(LiveEvent::Interrupted).await;
            } else if turn_complete {
                if let Some(chunk) = self.accumulator.flush() {
                    self.emit(LiveEvent::AudioComplete(chunk)).await;
                }
            }

            if let Some(transcription) = content.input_transcription {
                self.emit(LiveEvent::InputTranscription(transcription)).await;
            }
            if let Some(transcription) = content.output_transcription {
                self.emit(LiveEvent::OutputTranscription(transcription)).await;
            }
        }

        if let Some(update) = msg.session_resumption_update {
            self.emit(LiveEvent::SessionResumptionUpdate(update)).await;
        }
        if let Some(go_away) = msg.go_away {
            warn!(time_left = ?go_away.time_left, "server is closing the stream");
            self.emit(LiveEvent::GoAway(go_away)).await;
        }

        self.emit(LiveEvent::Raw(raw)).await;
    }

    async fn emit(&self, event: LiveEvent) {
        if self.events.send(event).await.is_err() {
            debug!("event receiver dropped");
        }
    }
}
