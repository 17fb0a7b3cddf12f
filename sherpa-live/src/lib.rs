//! # sherpa-live
//!
//! Real-time duplex voice sessions for the AI Sherpa voice practice mode.
//!
//! The learner talks to "Sherpa Tenzing", a remote generative model, over a
//! live audio connection. Microphone audio streams out continuously; model
//! audio streams back in chunks and is played gaplessly. When the learner
//! talks over the model, the server signals an interruption and all pending
//! playback is dropped at once.
//!
//! ## Architecture
//!
//! ```text
//!                   ┌────────────────────────────┐
//!       UI ◀──────▶ │       SessionHandle        │  status / mute / volume / close
//!                   └─────────────┬──────────────┘
//!                                 │ commands, snapshots
//!                   ┌─────────────▼──────────────┐
//!                   │     SessionController      │  one task owns everything
//!                   └──┬──────────┬───────────┬──┘
//!                      │          │           │
//!        ┌─────────────▼──┐ ┌─────▼──────┐ ┌──▼────────────────┐
//!        │ CapturePipeline│ │ LiveModel/ │ │ PlaybackScheduler │
//!        │ (mic, RMS, PCM)│ │ Connection │ │ (gapless, flush)  │
//!        └────────────────┘ └────────────┘ └───────────────────┘
//! ```
//!
//! Hardware sits behind the [`device`] traits and the network behind the
//! [`transport`] traits, so the whole session runs against fakes in tests.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sherpa_live::{LiveConfig, SessionController};
//! use sherpa_live::device::desktop::{CpalCapture, CpalRenderer};
//! use sherpa_live::gemini::GeminiLiveModel;
//! use std::sync::Arc;
//!
//! let model = Arc::new(GeminiLiveModel::from_env()?);
//! let (controller, handle) = SessionController::new(
//!     LiveConfig::default(),
//!     model,
//!     Box::new(CpalCapture::new()),
//!     Box::new(CpalRenderer::new()),
//! );
//! let session = tokio::spawn(controller.run());
//!
//! handle.toggle_mute();
//! handle.close();
//! session.await?;
//! ```

pub mod audio;
pub mod bridge;
pub mod capture;
pub mod codec;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod protocol;
pub mod scheduler;
pub mod state;
pub mod transport;

// Provider implementations
#[cfg(feature = "gemini")]
pub mod gemini;

// Re-exports
pub use audio::{AudioFormat, AudioFrame, PcmBuffer};
pub use bridge::{SessionCommand, SessionHandle};
pub use capture::{CaptureOutcome, CapturePipeline, FrameAssembler};
pub use codec::MediaBlob;
pub use config::{LiveConfig, LiveConfigBuilder};
pub use controller::{SessionController, SessionEvent};
pub use device::{AudioCapture, AudioRenderer, MicrophoneStream, OutputContext};
pub use error::{LiveError, Result};
pub use protocol::{ClientMessage, ServerMessage};
pub use scheduler::{PlaybackScheduler, ScheduledUnit, UnitId};
pub use state::{SessionSnapshot, SessionState};
pub use transport::{LiveConnection, LiveModel, TransportEvent};
