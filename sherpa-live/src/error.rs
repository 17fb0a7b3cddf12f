//! Error types for live voice sessions.

use thiserror::Error;

/// Result type for live session operations.
pub type Result<T> = std::result::Result<T, LiveError>;

/// Errors that can occur while running a live voice session.
#[derive(Error, Debug)]
pub enum LiveError {
    /// Microphone access was denied by the user or the platform.
    #[error("Microphone permission denied: {0}")]
    Permission(String),

    /// No usable capture or playback device.
    #[error("Audio device error: {0}")]
    Device(String),

    /// Remote session failed to open or dropped.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Malformed inbound audio payload.
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Unexpected or unparseable wire message.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Session already closed.
    #[error("Session already closed")]
    SessionClosed,

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LiveError {
    /// Create a new permission error.
    pub fn permission<S: Into<String>>(msg: S) -> Self {
        Self::Permission(msg.into())
    }

    /// Create a new device error.
    pub fn device<S: Into<String>>(msg: S) -> Self {
        Self::Device(msg.into())
    }

    /// Create a new connection error.
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a new decode error.
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new protocol error.
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error happened while setting the session up.
    ///
    /// Setup failures move the session to the error state; everything else is
    /// handled per message.
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, Self::Permission(_) | Self::Device(_) | Self::Connection(_))
    }
}
