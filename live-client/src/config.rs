//! Configuration types for live sessions.

use crate::error::{LiveError, Result};
use crate::wire::{AudioTranscriptionConfig, Content, SessionResumptionConfig, Setup};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "models/gemini-2.0-flash-live-001";

/// Tool/function declaration advertised in the setup envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: None, parameters: None }
    }

    /// Set the tool description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Set the parameters schema.
    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = Some(schema);
        self
    }
}

/// Configuration for a live session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Model to use; resolved through the platform adapter at setup time.
    pub model: Option<String>,
    /// System instruction for the conversation.
    pub instruction: Option<String>,
    /// Voice for audio output.
    pub voice: Option<String>,
    /// Response modalities: ["TEXT"], ["AUDIO"], or both.
    pub modalities: Option<Vec<String>>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Declared tools.
    pub tools: Option<Vec<ToolDefinition>>,
    /// Transcribe user audio input.
    pub input_transcription: bool,
    /// Transcribe model audio output.
    pub output_transcription: bool,
    /// Resume a previous session from this handle.
    pub resumption_handle: Option<String>,
}

impl SessionConfig {
    /// Create a new empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the system instruction.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    /// Set the voice.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Enable audio-only output.
    pub fn with_audio_only(mut self) -> Self {
        self.modalities = Some(vec!["AUDIO".to_string()]);
        self
    }

    /// Enable text-only output.
    pub fn with_text_only(mut self) -> Self {
        self.modalities = Some(vec!["TEXT".to_string()]);
        self
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Add a tool declaration.
    pub fn with_tool(mut self, tool: ToolDefinition) -> Self {
        self.tools.get_or_insert_with(Vec::new).push(tool);
        self
    }

    /// Enable input and output transcription.
    pub fn with_transcription(mut self) -> Self {
        self.input_transcription = true;
        self.output_transcription = true;
        self
    }

    /// Resume from a previous session handle.
    pub fn with_resumption_handle(mut self, handle: impl Into<String>) -> Self {
        self.resumption_handle = Some(handle.into());
        self
    }

    /// Build the setup envelope for a resolved model id.
    ///
    /// The model id must be namespaced (contain a `/` separator); a bare
    /// name is rejected before anything touches the network.
    pub fn to_setup(&self, model: &str) -> Result<Setup> {
        if !model.contains('/') {
            return Err(LiveError::config(format!(
                "model id must be namespaced (e.g. models/...), got {model:?}"
            )));
        }

        let mut generation_config = json!({
            "responseModalities": self
                .modalities
                .clone()
                .unwrap_or_else(|| vec!["AUDIO".to_string()]),
        });
        if let Some(voice) = &self.voice {
            generation_config["speechConfig"] = json!({
                "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
            });
        }
        if let Some(temp) = self.temperature {
            generation_config["temperature"] = json!(temp);
        }

        Ok(Setup {
            model: model.to_string(),
            system_instruction: self.instruction.clone().map(Content::text),
            generation_config: Some(generation_config),
            tools: convert_tools(self.tools.clone()),
            input_audio_transcription: self.input_transcription.then_some(AudioTranscriptionConfig {}),
            output_audio_transcription: self
                .output_transcription
                .then_some(AudioTranscriptionConfig {}),
            session_resumption: self
                .resumption_handle
                .clone()
                .map(|handle| SessionResumptionConfig { handle: Some(handle) }),
        })
    }
}

fn convert_tools(tools: Option<Vec<ToolDefinition>>) -> Option<Vec<Value>> {
    tools.filter(|t| !t.is_empty()).map(|t_vec| {
        let function_declarations: Vec<Value> = t_vec
            .into_iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description.unwrap_or_default(),
                    "parameters": t.parameters.unwrap_or_else(|| json!({ "type": "object", "properties": {} }))
                })
            })
            .collect();

        vec![json!({ "functionDeclarations": function_declarations })]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_model_id_rejected() {
        let config = SessionConfig::new();
        let err = config.to_setup("gemini-2.0-flash-live").unwrap_err();
        assert!(matches!(err, LiveError::ConfigError(_)));
    }

    #[test]
    fn test_setup_defaults_to_audio_modality() {
        let setup = SessionConfig::new().to_setup("models/m").unwrap();
        let generation = setup.generation_config.unwrap();
        assert_eq!(generation["responseModalities"], json!(["AUDIO"]));
        assert!(setup.input_audio_transcription.is_none());
        assert!(setup.session_resumption.is_none());
    }

    #[test]
    fn test_setup_carries_voice_and_transcription() {
        let setup = SessionConfig::new()
            .with_voice("Puck")
            .with_transcription()
            .with_resumption_handle("handle-1")
            .to_setup("models/m")
            .unwrap();
        let generation = setup.generation_config.unwrap();
        assert_eq!(
            generation["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            json!("Puck")
        );
        assert!(setup.input_audio_transcription.is_some());
        assert!(setup.output_audio_transcription.is_some());
        assert_eq!(setup.session_resumption.unwrap().handle.as_deref(), Some("handle-1"));
    }

    #[test]
    fn test_convert_tools() {
        let setup = SessionConfig::new()
            .with_tool(
                ToolDefinition::new("get_weather")
                    .with_description("Get current weather")
                    .with_parameters(json!({
                        "type": "object",
                        "properties": { "location": { "type": "string" } }
                    })),
            )
            .with_tool(ToolDefinition::new("no_params"))
            .to_setup("models/m")
            .unwrap();

        let tools = setup.tools.unwrap();
        let decls = tools[0].get("functionDeclarations").unwrap().as_array().unwrap();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0]["name"], "get_weather");
        assert_eq!(decls[0]["description"], "Get current weather");
        assert_eq!(decls[1]["name"], "no_params");
        assert_eq!(decls[1]["parameters"]["type"], "object");
    }

    #[test]
    fn test_convert_tools_empty() {
        let setup = SessionConfig { tools: Some(vec![]), ..Default::default() }
            .to_setup("models/m")
            .unwrap();
        assert!(setup.tools.is_none());
    }
}
