//! Remote duplex session abstraction.
//!
//! A [`LiveModel`] opens a [`LiveConnection`]; the connection accepts encoded
//! microphone frames and yields a tagged stream of [`TransportEvent`]s. The
//! session controller only depends on these traits, so tests can drive it
//! with an in-memory transport.

use crate::codec::MediaBlob;
use crate::config::LiveConfig;
use crate::error::{LiveError, Result};
use crate::protocol::ServerMessage;
use async_trait::async_trait;
use std::sync::Arc;

/// Inbound events of a remote session, in arrival order.
#[derive(Debug)]
pub enum TransportEvent {
    /// The remote side accepted the session setup.
    Open,
    /// A server message arrived.
    Message(ServerMessage),
    /// The remote side closed the connection.
    Closed {
        /// Close reason, if the server gave one.
        reason: Option<String>,
    },
    /// The transport failed.
    Error(LiveError),
}

/// An open duplex connection to the remote model.
#[async_trait]
pub trait LiveConnection: Send + Sync {
    /// Unique id of this connection.
    fn session_id(&self) -> &str;

    /// Whether the connection is still usable.
    fn is_connected(&self) -> bool;

    /// Send one encoded microphone frame.
    async fn send_media(&self, blob: MediaBlob) -> Result<()>;

    /// Wait for the next inbound event.
    ///
    /// Returns `None` once the connection is finished.
    async fn next_event(&self) -> Option<TransportEvent>;

    /// Close the connection. Closing twice is not an error.
    async fn close(&self) -> Result<()>;
}

/// A factory for live connections.
#[async_trait]
pub trait LiveModel: Send + Sync {
    /// Provider name (e.g. "gemini").
    fn provider(&self) -> &str;

    /// Open a connection configured with persona, voice and modalities.
    async fn connect(&self, config: &LiveConfig) -> Result<SharedConnection>;
}

/// A shared connection handle.
pub type SharedConnection = Arc<dyn LiveConnection>;

/// A shared model handle.
pub type BoxedModel = Arc<dyn LiveModel>;
