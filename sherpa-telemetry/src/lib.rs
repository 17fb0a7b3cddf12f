//! # Sherpa Telemetry
//!
//! Structured logging for live voice sessions.
//!
//! ## Features
//! - Structured logging with `tracing`
//! - `RUST_LOG` driven filtering, defaulting to `info`
//! - Human readable or JSON output
//! - Span helpers for sessions, transports and playback
//!
//! ## Usage
//!
//! ```rust
//! use sherpa_telemetry::{init_telemetry, info, instrument};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     // Initialize telemetry in your main
//!     init_telemetry("voice-practice")?;
//!
//!     #[instrument]
//!     async fn speak() {
//!         info!("Learner started speaking");
//!     }
//!     Ok(())
//! }
//! ```

pub mod init;
pub mod spans;

// Re-export tracing macros for convenience
pub use tracing::{Span, debug, error, info, instrument, trace, warn};

// Re-export span helpers
pub use spans::*;

// Re-export init functions
pub use init::{init_json_telemetry, init_telemetry};
