//! Session event stream.
//!
//! Inbound traffic is demultiplexed into a single tagged-union event type
//! delivered over a bounded channel. Consumers drive an explicit receive
//! loop, which preserves inbound ordering and gives natural back-pressure
//! (unlike observer callbacks).

use crate::audio::AudioChunk;
use crate::error::LiveError;
use crate::wire::{GoAway, SessionResumptionUpdate, Transcription};
use serde_json::Value;
use std::sync::Arc;

/// Events emitted by a live session.
#[derive(Debug, Clone)]
pub enum LiveEvent {
    /// Transport is open. Also fired after a transparent reconnect, which
    /// marks a fresh session boundary: setup is not resent automatically.
    Connected,

    /// Server acknowledged the setup envelope.
    SetupComplete,

    /// A text fragment of the model turn. `turn_complete` marks the final
    /// fragment for this turn.
    TextChunk {
        /// Text content.
        text: String,
        /// Whether this is the last fragment of the turn.
        turn_complete: bool,
    },

    /// The model turn's audio, reassembled across inline-data parts.
    AudioComplete(AudioChunk),

    /// The model turn was interrupted; buffered audio was discarded.
    Interrupted,

    /// Live transcription of user audio input.
    InputTranscription(Transcription),

    /// Live transcription of model audio output.
    OutputTranscription(Transcription),

    /// New resumption handle for this session.
    SessionResumptionUpdate(SessionResumptionUpdate),

    /// The server will close the stream; stop sending.
    GoAway(GoAway),

    /// Catch-all: the full inbound envelope, emitted after all specific
    /// events for that envelope.
    Raw(Value),

    /// A background failure (transport or receive path). State does not
    /// change; the transport owns reconnection.
    Error(Arc<LiveError>),

    /// The session is closed; no further events follow.
    Closed,
}
