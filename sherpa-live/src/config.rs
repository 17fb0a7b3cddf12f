//! Configuration for live voice sessions.

use crate::audio::{AudioFormat, CAPTURE_FRAME_SIZE};
use crate::error::{LiveError, Result};
use serde::{Deserialize, Serialize};

/// Live model used for voice practice.
pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-09-2025";

/// Prebuilt voice of the Sherpa persona.
pub const DEFAULT_VOICE: &str = "Fenrir";

/// System instruction describing the Sherpa persona.
pub const SHERPA_INSTRUCTION: &str = "You are Sherpa Tenzing, a helpful mountaineering guide \
teaching the user about AI. Keep it short, conversational, and fun. Use metaphors about \
climbing mountains.";

/// Environment variables checked, in order, for the API key.
pub const API_KEY_VARS: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Configuration for a live voice session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Model identifier sent in the setup message.
    pub model: String,

    /// System instruction for the assistant persona.
    pub instruction: String,

    /// Prebuilt voice for audio output.
    pub voice: String,

    /// Response modalities requested from the model.
    pub modalities: Vec<String>,

    /// Microphone capture format.
    pub input_format: AudioFormat,

    /// Model audio playback format.
    pub output_format: AudioFormat,

    /// Samples per captured frame.
    pub frame_size: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            instruction: SHERPA_INSTRUCTION.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            modalities: vec!["AUDIO".to_string()],
            input_format: AudioFormat::pcm16_16khz(),
            output_format: AudioFormat::pcm16_24khz(),
            frame_size: CAPTURE_FRAME_SIZE,
        }
    }
}

impl LiveConfig {
    /// Create the default Sherpa configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for LiveConfig.
    pub fn builder() -> LiveConfigBuilder {
        LiveConfigBuilder::new()
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the system instruction.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Set the voice.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Set the capture frame size.
    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    /// Check the configuration before a session starts.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(LiveError::config("model must not be empty"));
        }
        if self.frame_size == 0 {
            return Err(LiveError::config("frame_size must be greater than zero"));
        }
        for format in [&self.input_format, &self.output_format] {
            if format.sample_rate == 0 || format.channels == 0 {
                return Err(LiveError::config(format!("unusable audio format {:?}", format)));
            }
        }
        if self.input_format.channels != 1 {
            return Err(LiveError::config("microphone capture must be mono"));
        }
        Ok(())
    }
}

/// Builder for LiveConfig.
#[derive(Debug, Clone, Default)]
pub struct LiveConfigBuilder {
    config: LiveConfig,
}

impl LiveConfigBuilder {
    /// Create a new builder seeded with the Sherpa defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the system instruction.
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.instruction = instruction.into();
        self
    }

    /// Set the voice.
    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.config.voice = voice.into();
        self
    }

    /// Set the microphone format.
    pub fn input_format(mut self, format: AudioFormat) -> Self {
        self.config.input_format = format;
        self
    }

    /// Set the playback format.
    pub fn output_format(mut self, format: AudioFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Set the capture frame size.
    pub fn frame_size(mut self, frame_size: usize) -> Self {
        self.config.frame_size = frame_size;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<LiveConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Read the API key from the environment.
pub fn api_key_from_env() -> Result<String> {
    API_KEY_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
        .ok_or_else(|| {
            LiveError::config(format!("missing API key, set one of {}", API_KEY_VARS.join(", ")))
        })
}
