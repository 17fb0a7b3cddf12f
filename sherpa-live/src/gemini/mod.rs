//! Gemini Live API transport.
//!
//! Connects to Google's WebSocket-based Live API and translates its JSON
//! frames into [`TransportEvent`](crate::transport::TransportEvent)s.
//!
//! - Input audio: 16kHz mono PCM
//! - Output audio: 24kHz mono PCM
//!
//! # Example
//!
//! ```rust,ignore
//! use sherpa_live::gemini::GeminiLiveModel;
//! use sherpa_live::{LiveConfig, LiveModel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = GeminiLiveModel::from_env()?;
//!     let connection = model.connect(&LiveConfig::default()).await?;
//!
//!     while let Some(event) = connection.next_event().await {
//!         println!("{:?}", event);
//!     }
//!     Ok(())
//! }
//! ```

mod connection;
mod model;

pub use connection::GeminiLiveConnection;
pub use model::GeminiLiveModel;

/// Gemini Live API WebSocket endpoint.
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Prebuilt voices offered by Gemini Live.
pub const GEMINI_VOICES: &[&str] = &["Puck", "Charon", "Kore", "Fenrir", "Aoede"];
