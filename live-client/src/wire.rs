//! Wire format for the live session protocol.
//!
//! Outbound and inbound envelopes are plain JSON with camelCase keys and
//! null fields omitted. An outbound [`ClientMessage`] carries exactly one
//! populated variant; an inbound [`ServerMessage`] may carry any subset of
//! its fields, so every check in the dispatcher runs independently.

use crate::error::{LiveError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Outbound envelopes ──────────────────────────────────────────────────

/// Client-to-server message. Exactly one field is populated per send; the
/// constructors below are the only way to build one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    setup: Option<Setup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_content: Option<ClientContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    realtime_input: Option<RealtimeInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_response: Option<ToolResponsePayload>,
}

impl ClientMessage {
    /// Initial handshake envelope.
    pub fn setup(setup: Setup) -> Self {
        Self { setup: Some(setup), client_content: None, realtime_input: None, tool_response: None }
    }

    /// Structured conversation turns.
    pub fn client_content(content: ClientContent) -> Self {
        Self { setup: None, client_content: Some(content), realtime_input: None, tool_response: None }
    }

    /// Streaming media input.
    pub fn realtime_input(input: RealtimeInput) -> Self {
        Self { setup: None, client_content: None, realtime_input: Some(input), tool_response: None }
    }

    /// Aggregated function responses.
    pub fn tool_response(response: ToolResponsePayload) -> Self {
        Self { setup: None, client_content: None, realtime_input: None, tool_response: Some(response) }
    }
}

/// Session handshake: model, generation config, tools, transcription options.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<AudioTranscriptionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<AudioTranscriptionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_resumption: Option<SessionResumptionConfig>,
}

/// Presence of this (empty) object enables transcription for a direction.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AudioTranscriptionConfig {}

/// Opt into resumption, optionally resuming from a previous handle.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResumptionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

/// A conversation turn or instruction block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// A single-part user turn.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part { text: Some(text.into()), inline_data: None }],
        }
    }

    /// A role-less instruction block (systemInstruction).
    pub fn text(text: impl Into<String>) -> Self {
        Self { role: None, parts: vec![Part { text: Some(text.into()), inline_data: None }] }
    }
}

/// A message fragment: text or inline binary data, possibly both absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

/// Base64 payload tagged with a MIME type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Turn-structured client content.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

/// Streaming realtime media input.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

/// One base64 media chunk, e.g. `audio/pcm;rate=16000`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

/// Aggregated responses for a tool call batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponsePayload {
    pub function_responses: Vec<FunctionResponse>,
}

/// Response to a single server-issued function call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub response: Value,
}

// ── Inbound envelopes ───────────────────────────────────────────────────

/// Server-to-client message. Any subset of fields may be present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMessage {
    pub setup_complete: Option<Value>,
    pub server_content: Option<ServerContent>,
    pub tool_call: Option<ToolCallPayload>,
    pub session_resumption_update: Option<SessionResumptionUpdate>,
    pub go_away: Option<GoAway>,
}

/// Incremental model output plus turn markers and transcriptions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    pub model_turn: Option<Content>,
    pub turn_complete: bool,
    pub interrupted: bool,
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
}

/// Live transcription fragment for one direction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transcription {
    pub text: Option<String>,
    pub finished: Option<bool>,
}

/// A batch of function calls issued by the model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolCallPayload {
    pub function_calls: Vec<FunctionCall>,
}

/// One server-issued function call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// Updated resumption handle for this session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionResumptionUpdate {
    pub new_handle: Option<String>,
    pub resumable: Option<bool>,
}

/// Notice that the stream will close; no further sends should be attempted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoAway {
    pub time_left: Option<String>,
}

// ── Codec ───────────────────────────────────────────────────────────────

/// Encode an outbound envelope as one JSON text frame.
pub fn encode(msg: &ClientMessage) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| LiveError::protocol(format!("encode error: {e}")))
}

/// Decode one inbound frame (text or binary; binary frames carry UTF-8
/// JSON). Returns both the typed envelope and the raw JSON value so the
/// catch-all event can carry the full payload.
pub fn decode(payload: &[u8]) -> Result<(ServerMessage, Value)> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| LiveError::protocol(format!("decode error: {e}")))?;
    let msg: ServerMessage = serde_json::from_value(value.clone())
        .map_err(|e| LiveError::protocol(format!("decode error: {e}")))?;
    Ok((msg, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_setup_omits_null_fields() {
        let msg = ClientMessage::setup(Setup {
            model: "models/gemini-2.0-flash-live".to_string(),
            ..Default::default()
        });
        let value: Value = serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert_eq!(value, json!({ "setup": { "model": "models/gemini-2.0-flash-live" } }));
    }

    #[test]
    fn test_client_content_wire_shape() {
        let msg = ClientMessage::client_content(ClientContent {
            turns: vec![Content::user_text("hello")],
            turn_complete: true,
        });
        let value: Value = serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "clientContent": {
                    "turns": [{ "role": "user", "parts": [{ "text": "hello" }] }],
                    "turnComplete": true
                }
            })
        );
    }

    #[test]
    fn test_realtime_input_wire_shape() {
        let msg = ClientMessage::realtime_input(RealtimeInput {
            media_chunks: vec![MediaChunk {
                mime_type: "audio/pcm;rate=16000".to_string(),
                data: "AAAA".to_string(),
            }],
        });
        let value: Value = serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "realtimeInput": {
                    "mediaChunks": [{ "mimeType": "audio/pcm;rate=16000", "data": "AAAA" }]
                }
            })
        );
    }

    #[test]
    fn test_tool_response_wire_shape() {
        let msg = ClientMessage::tool_response(ToolResponsePayload {
            function_responses: vec![FunctionResponse {
                id: Some("call-1".to_string()),
                name: Some("get_weather".to_string()),
                response: json!({ "result": "sunny" }),
            }],
        });
        let value: Value = serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "toolResponse": {
                    "functionResponses": [{
                        "id": "call-1",
                        "name": "get_weather",
                        "response": { "result": "sunny" }
                    }]
                }
            })
        );
    }

    #[test]
    fn test_decode_server_content() {
        let raw = json!({
            "serverContent": {
                "modelTurn": { "parts": [
                    { "text": "hi" },
                    { "inlineData": { "mimeType": "audio/pcm;rate=24000", "data": "UklG" } }
                ]},
                "turnComplete": true
            }
        });
        let (msg, value) = decode(raw.to_string().as_bytes()).unwrap();
        assert_eq!(value, raw);
        let content = msg.server_content.unwrap();
        assert!(content.turn_complete);
        assert!(!content.interrupted);
        let parts = content.model_turn.unwrap().parts;
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text.as_deref(), Some("hi"));
        assert_eq!(parts[1].inline_data.as_ref().unwrap().mime_type, "audio/pcm;rate=24000");
    }

    #[test]
    fn test_decode_tool_call_and_go_away() {
        let raw = json!({
            "toolCall": { "functionCalls": [{ "id": "1", "name": "f", "args": { "x": 1 } }] },
            "goAway": { "timeLeft": "10s" }
        });
        let (msg, _) = decode(raw.to_string().as_bytes()).unwrap();
        let calls = msg.tool_call.unwrap().function_calls;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "f");
        assert_eq!(msg.go_away.unwrap().time_left.as_deref(), Some("10s"));
    }

    #[test]
    fn test_decode_malformed_frame() {
        let err = decode(b"{not json").unwrap_err();
        assert!(matches!(err, LiveError::MessageError(_)));
    }

    #[test]
    fn test_decode_unknown_fields_ignored() {
        let raw = json!({ "somethingNew": { "a": 1 }, "setupComplete": {} });
        let (msg, _) = decode(raw.to_string().as_bytes()).unwrap();
        assert!(msg.setup_complete.is_some());
        assert!(msg.server_content.is_none());
    }
}
