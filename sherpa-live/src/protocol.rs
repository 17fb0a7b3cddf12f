//! Wire envelopes of the Live API.
//!
//! Only the fields this crate acts on are modelled; unknown fields are
//! ignored on the way in.

use crate::codec::MediaBlob;
use crate::config::LiveConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Client messages ─────────────────────────────────────────────────────

/// Message sent from the client to the Live API.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup: Option<Setup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_input: Option<RealtimeInput>,
}

/// First message of every session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

/// Text content with a list of parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// Streaming microphone input.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaBlob>,
}

impl ClientMessage {
    /// Build the setup message for a session.
    pub fn setup(config: &LiveConfig) -> Self {
        let system_instruction = (!config.instruction.is_empty()).then(|| Content {
            parts: vec![Part { text: Some(config.instruction.clone()), inline_data: None }],
        });

        Self {
            setup: Some(Setup {
                model: config.model.clone(),
                generation_config: GenerationConfig {
                    response_modalities: config.modalities.clone(),
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: config.voice.clone(),
                            },
                        },
                    },
                },
                system_instruction,
            }),
            realtime_input: None,
        }
    }

    /// Wrap one encoded microphone frame.
    pub fn media(blob: MediaBlob) -> Self {
        Self { setup: None, realtime_input: Some(RealtimeInput { media_chunks: vec![blob] }) }
    }

    /// Serialize to the JSON text frame.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Server messages ─────────────────────────────────────────────────────

/// Message received from the Live API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_complete: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_content: Option<ServerContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_away: Option<GoAway>,
}

/// Model output and turn signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_turn: Option<ModelTurn>,
    /// The user barged in; pending model audio must be dropped.
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub turn_complete: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

/// Base64 media payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub data: String,
}

/// Notice that the server will close the connection soon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_left: Option<String>,
}

impl ServerMessage {
    /// Parse a JSON text frame.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// A message carrying one base64 audio part.
    pub fn audio(data: impl Into<String>) -> Self {
        Self {
            server_content: Some(ServerContent {
                model_turn: Some(ModelTurn {
                    parts: vec![Part {
                        text: None,
                        inline_data: Some(InlineData { mime_type: None, data: data.into() }),
                    }],
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// A message carrying only the interruption signal.
    pub fn interrupted() -> Self {
        Self {
            server_content: Some(ServerContent { interrupted: true, ..Default::default() }),
            ..Default::default()
        }
    }

    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.server_content
            .as_ref()
            .and_then(|c| c.model_turn.as_ref())
            .into_iter()
            .flat_map(|turn| turn.parts.iter())
    }

    /// Base64 audio payloads of the model turn, in part order.
    pub fn audio_payloads(&self) -> impl Iterator<Item = &str> {
        self.parts()
            .filter_map(|part| part.inline_data.as_ref())
            .filter(|data| !data.data.is_empty())
            .map(|data| data.data.as_str())
    }

    /// Text parts of the model turn concatenated.
    pub fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|part| part.text.as_deref()).collect();
        (!text.is_empty()).then_some(text)
    }

    /// Whether the server signalled a barge-in.
    pub fn is_interrupted(&self) -> bool {
        self.server_content.as_ref().is_some_and(|c| c.interrupted)
    }

    /// Whether the model finished its turn.
    pub fn is_turn_complete(&self) -> bool {
        self.server_content.as_ref().is_some_and(|c| c.turn_complete)
    }

    /// Whether this acknowledges the setup message.
    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }
}
