//! Gemini Live model implementation.

use crate::config::{LiveConfig, api_key_from_env};
use crate::error::{LiveError, Result};
use crate::transport::{LiveModel, SharedConnection};
use async_trait::async_trait;
use std::sync::Arc;

use super::connection::GeminiLiveConnection;
use super::{GEMINI_LIVE_URL, GEMINI_VOICES};

/// Factory for Gemini Live connections.
///
/// # Example
///
/// ```rust,ignore
/// use sherpa_live::gemini::GeminiLiveModel;
///
/// let model = GeminiLiveModel::new("api-key");
/// let connection = model.connect(&LiveConfig::default()).await?;
/// ```
#[derive(Clone)]
pub struct GeminiLiveModel {
    api_key: String,
    endpoint: String,
}

impl GeminiLiveModel {
    /// Create a model authenticating with `api_key`.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), endpoint: GEMINI_LIVE_URL.to_string() }
    }

    /// Create a model using the API key from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(api_key_from_env()?))
    }

    /// Use a different WebSocket endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Voices accepted by the service.
    pub fn available_voices(&self) -> &'static [&'static str] {
        GEMINI_VOICES
    }

    fn url(&self) -> String {
        format!("{}?key={}", self.endpoint, self.api_key)
    }
}

#[async_trait]
impl LiveModel for GeminiLiveModel {
    fn provider(&self) -> &str {
        "gemini"
    }

    async fn connect(&self, config: &LiveConfig) -> Result<SharedConnection> {
        if self.api_key.is_empty() {
            return Err(LiveError::connection("Gemini API key is empty"));
        }
        if !GEMINI_VOICES.contains(&config.voice.as_str()) {
            tracing::warn!(voice = %config.voice, "Voice is not a known Gemini Live voice");
        }
        let connection = GeminiLiveConnection::connect(&self.url(), config).await?;
        Ok(Arc::new(connection))
    }
}

impl std::fmt::Debug for GeminiLiveModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiLiveModel").field("endpoint", &self.endpoint).finish()
    }
}
