use crate::codec::MediaBlob;
use crate::config::LiveConfig;
use crate::error::{LiveError, Result};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::transport::{LiveConnection, TransportEvent};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{connect_async, tungstenite::Message};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = futures::stream::SplitSink<WsStream, Message>;
type WsSource = futures::stream::SplitStream<WsStream>;

/// Gemini Live connection.
///
/// Manages one WebSocket to the Live API. The setup message is sent during
/// [`connect`](Self::connect); the server's `setupComplete` surfaces as
/// [`TransportEvent::Open`].
pub struct GeminiLiveConnection {
    session_id: String,
    connected: Arc<AtomicBool>,
    sender: Arc<Mutex<WsSink>>,
    receiver: Arc<Mutex<WsSource>>,
}

impl GeminiLiveConnection {
    /// Open the WebSocket and send the setup message.
    pub async fn connect(url: &str, config: &LiveConfig) -> Result<Self> {
        let request = url.into_client_request().map_err(|e| {
            LiveError::connection(format!("Failed to create client request: {}", e))
        })?;
        let (stream, _response) = connect_async(request)
            .await
            .map_err(|e| LiveError::connection(format!("WebSocket connect error: {}", e)))?;

        let (sink, source) = stream.split();
        let connection = Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            connected: Arc::new(AtomicBool::new(true)),
            sender: Arc::new(Mutex::new(sink)),
            receiver: Arc::new(Mutex::new(source)),
        };

        tracing::info!(model_id = %config.model, voice = %config.voice, "Sending setup message");
        connection.send_raw(&ClientMessage::setup(config)).await?;
        Ok(connection)
    }

    async fn send_raw(&self, message: &ClientMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(LiveError::SessionClosed);
        }
        let text = message.to_json()?;

        let mut sender = self.sender.lock().await;
        sender
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| LiveError::connection(format!("Send error: {}", e)))
    }

    /// Receive frames until one translates into an event.
    async fn receive(&self) -> Option<TransportEvent> {
        if !self.is_connected() {
            return None;
        }
        let mut receiver = self.receiver.lock().await;

        loop {
            let text = match receiver.next().await {
                Some(Ok(Message::Text(text))) => text.to_string(),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, "Invalid UTF-8 in binary message");
                        continue;
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    self.connected.store(false, Ordering::SeqCst);
                    let reason = frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                    return Some(TransportEvent::Closed { reason });
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.connected.store(false, Ordering::SeqCst);
                    return Some(TransportEvent::Error(LiveError::connection(format!(
                        "Receive error: {}",
                        e
                    ))));
                }
                None => {
                    self.connected.store(false, Ordering::SeqCst);
                    return Some(TransportEvent::Closed { reason: None });
                }
            };

            match translate(&text) {
                Ok(event) => return Some(event),
                Err(e) => tracing::warn!(error = %e, "Skipping unparseable server message"),
            }
        }
    }
}

/// Translate a raw server frame into a transport event.
fn translate(raw: &str) -> Result<TransportEvent> {
    tracing::trace!(%raw, "Translating Gemini event");
    let message = ServerMessage::from_json(raw)
        .map_err(|e| LiveError::protocol(format!("unparseable server message: {}", e)))?;
    if message.is_setup_complete() {
        return Ok(TransportEvent::Open);
    }
    Ok(TransportEvent::Message(message))
}

#[async_trait]
impl LiveConnection for GeminiLiveConnection {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_media(&self, blob: MediaBlob) -> Result<()> {
        self.send_raw(&ClientMessage::media(blob)).await
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        self.receive().await
    }

    async fn close(&self) -> Result<()> {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        let mut sender = self.sender.lock().await;
        sender
            .send(Message::Close(None))
            .await
            .map_err(|e| LiveError::connection(format!("Close error: {}", e)))
    }
}

impl std::fmt::Debug for GeminiLiveConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiLiveConnection")
            .field("session_id", &self.session_id)
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_complete_opens() {
        assert!(matches!(translate(r#"{"setupComplete":{}}"#), Ok(TransportEvent::Open)));
    }

    #[test]
    fn test_server_content_is_message() {
        let event = translate(r#"{"serverContent":{"interrupted":true}}"#).unwrap();
        match event {
            TransportEvent::Message(msg) => assert!(msg.is_interrupted()),
            other => panic!("Expected message, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_is_protocol_error() {
        assert!(matches!(translate("{"), Err(LiveError::Protocol(_))));
    }
}
