//! Session controller: lifecycle, event routing and teardown.
//!
//! The controller is the single owner of the microphone, both audio contexts,
//! the playback scheduler and the remote connection. Everything that happens
//! to a session arrives as a [`SessionEvent`] and goes through
//! [`SessionController::handle`].
//!
//! ```text
//!   microphone ──frames──▶ CapturePipeline ──MediaBlob──▶ LiveConnection
//!                                                             │
//!   OutputContext ◀── PlaybackScheduler ◀── codec ◀── ServerMessage
//! ```

use crate::audio::AudioFrame;
use crate::bridge::{SessionCommand, SessionHandle};
use crate::capture::{CapturePipeline, CaptureStats};
use crate::codec::decode_base64;
use crate::config::LiveConfig;
use crate::device::{AudioCapture, AudioRenderer, MicrophoneStream, OutputContext};
use crate::error::{LiveError, Result};
use crate::protocol::ServerMessage;
use crate::scheduler::{PlaybackScheduler, UnitId};
use crate::state::{SessionSnapshot, SessionState};
use crate::transport::{BoxedModel, SharedConnection, TransportEvent};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{mpsc, watch};
use tracing::{Instrument, debug, error, info, trace, warn};

/// Everything the controller reacts to.
#[derive(Debug)]
pub enum SessionEvent {
    /// Inbound event of the remote connection.
    Transport(TransportEvent),
    /// A microphone frame was captured.
    CaptureFrame(AudioFrame),
    /// A playback unit finished on its own.
    PlaybackEnded(UnitId),
    /// A request from the UI.
    Command(SessionCommand),
}

/// Owns one live voice session.
pub struct SessionController {
    config: LiveConfig,
    model: BoxedModel,
    capture: Arc<dyn AudioCapture>,
    renderer: Arc<dyn AudioRenderer>,

    state: SessionState,
    mic: Option<Box<dyn MicrophoneStream>>,
    scheduler: Option<PlaybackScheduler<Box<dyn OutputContext>>>,
    connection: Option<SharedConnection>,
    pipeline: CapturePipeline,

    snapshot: watch::Sender<SessionSnapshot>,
    frames_tx: mpsc::UnboundedSender<AudioFrame>,
    frames_rx: mpsc::UnboundedReceiver<AudioFrame>,
    ended_tx: mpsc::UnboundedSender<UnitId>,
    ended_rx: mpsc::UnboundedReceiver<UnitId>,
    commands_rx: mpsc::UnboundedReceiver<SessionCommand>,
}

impl SessionController {
    /// Create a controller and the UI handle that mirrors it.
    pub fn new(
        config: LiveConfig,
        model: BoxedModel,
        capture: Box<dyn AudioCapture>,
        renderer: Box<dyn AudioRenderer>,
    ) -> (Self, SessionHandle) {
        let muted = Arc::new(AtomicBool::new(false));
        let (snapshot, snapshot_rx) = watch::channel(SessionSnapshot::default());
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (ended_tx, ended_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let pipeline = CapturePipeline::new(config.input_format, config.frame_size, muted.clone());
        let handle = SessionHandle::new(snapshot_rx, muted, commands_tx);

        let controller = Self {
            config,
            model,
            capture: Arc::from(capture),
            renderer: Arc::from(renderer),
            state: SessionState::Connecting,
            mic: None,
            scheduler: None,
            connection: None,
            pipeline,
            snapshot,
            frames_tx,
            frames_rx,
            ended_tx,
            ended_rx,
            commands_rx,
        };
        (controller, handle)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Id of the remote connection, once connected.
    pub fn session_id(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.session_id())
    }

    /// The playback scheduler, while the output context is open.
    pub fn scheduler(&self) -> Option<&PlaybackScheduler<Box<dyn OutputContext>>> {
        self.scheduler.as_ref()
    }

    /// Capture frame counters.
    pub fn capture_stats(&self) -> CaptureStats {
        self.pipeline.stats()
    }

    /// Whether the microphone is tapped.
    pub fn is_capturing(&self) -> bool {
        self.pipeline.is_running()
    }

    /// Acquire devices and open the remote connection.
    ///
    /// On failure the session moves to [`SessionState::Error`], everything
    /// acquired so far is released and no retry is attempted.
    pub async fn start(&mut self) -> Result<()> {
        if self.state != SessionState::Connecting || self.connection.is_some() {
            return Err(LiveError::SessionClosed);
        }

        match self.try_start().await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(error = %e, "Failed to start live session");
                self.fail(&e).await;
                Err(e)
            }
        }
    }

    async fn try_start(&mut self) -> Result<()> {
        self.config.validate()?;

        let capture = self.capture.clone();
        let input_format = self.config.input_format;
        let mic = on_blocking_pool(move || capture.open(&input_format)).await?;
        self.mic = Some(mic);
        debug!(rate = self.config.input_format.sample_rate, "Microphone acquired");

        let renderer = self.renderer.clone();
        let output_format = self.config.output_format;
        let ended = self.ended_tx.clone();
        let output = on_blocking_pool(move || renderer.open(&output_format, ended)).await?;
        self.scheduler = Some(PlaybackScheduler::new(output));
        debug!(rate = self.config.output_format.sample_rate, "Output context opened");

        info!(
            provider = self.model.provider(),
            model = %self.config.model,
            voice = %self.config.voice,
            "Connecting live session"
        );
        let span = sherpa_telemetry::transport_span(self.model.provider());
        let connection = self.model.connect(&self.config).instrument(span).await?;
        sherpa_telemetry::record_session_id(connection.session_id());
        info!(session_id = connection.session_id(), "Live connection established");
        self.connection = Some(connection);
        Ok(())
    }

    /// Apply one event to the session.
    pub async fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Transport(TransportEvent::Open) => self.on_open().await,
            SessionEvent::Transport(TransportEvent::Message(msg)) => self.on_message(msg),
            SessionEvent::Transport(TransportEvent::Closed { reason }) => {
                info!(reason = reason.as_deref().unwrap_or(""), "Live session closed by server");
                self.connection = None;
                if self.state.is_active() {
                    self.fail(&LiveError::connection("session closed by server")).await;
                }
            }
            SessionEvent::Transport(TransportEvent::Error(e)) => {
                error!(error = %e, "Live transport failed");
                self.fail(&e).await;
            }
            SessionEvent::CaptureFrame(frame) => self.on_frame(frame).await,
            SessionEvent::PlaybackEnded(id) => {
                if let Some(scheduler) = self.scheduler.as_mut() {
                    scheduler.complete(id);
                }
            }
            SessionEvent::Command(SessionCommand::MuteChanged(muted)) => {
                info!(muted, "Microphone mute changed");
                self.snapshot.send_modify(|s| s.muted = muted);
            }
            SessionEvent::Command(SessionCommand::Close) => self.close().await,
        }
    }

    async fn on_open(&mut self) {
        if !self.state.can_transition_to(SessionState::Connected) {
            debug!(state = %self.state, "Ignoring open event");
            return;
        }
        self.transition(SessionState::Connected);

        let started = match self.mic.as_deref_mut() {
            Some(mic) => self.pipeline.start(mic, self.frames_tx.clone()),
            None => Err(LiveError::device("microphone is not acquired")),
        };
        if let Err(e) = started {
            error!(error = %e, "Failed to start capture");
            self.fail(&e).await;
        }
    }

    fn on_message(&mut self, msg: ServerMessage) {
        if !self.state.is_active() {
            debug!(state = %self.state, "Dropping server message");
            return;
        }
        let Some(scheduler) = self.scheduler.as_mut() else {
            return;
        };

        let reaped = scheduler.reap();
        if reaped > 0 {
            trace!(reaped, "Dropped units that ended without a notification");
        }

        for payload in msg.audio_payloads() {
            match decode_base64(payload, &self.config.output_format) {
                Ok(buffer) => {
                    if let Err(e) = scheduler.enqueue(buffer) {
                        warn!(error = %e, "Failed to schedule model audio");
                    }
                }
                Err(e) => warn!(error = %e, "Dropping malformed audio chunk"),
            }
        }

        if msg.is_interrupted() {
            let _span = sherpa_telemetry::flush_span(scheduler.active_len()).entered();
            let stopped = scheduler.flush();
            info!(stopped, "Model interrupted, playback flushed");
        }

        if let Some(text) = msg.text() {
            debug!(%text, "Model text");
        }
        if msg.is_turn_complete() {
            debug!("Model turn complete");
        }
        if let Some(go_away) = &msg.go_away {
            warn!(time_left = go_away.time_left.as_deref().unwrap_or(""), "Server going away");
        }
    }

    async fn on_frame(&mut self, frame: AudioFrame) {
        if self.state != SessionState::Connected {
            return;
        }

        let outcome = self.pipeline.process(&frame.samples);
        self.snapshot.send_modify(|s| s.volume = outcome.volume);

        let (Some(blob), Some(connection)) = (outcome.outbound, self.connection.clone()) else {
            return;
        };
        let sent = connection.send_media(blob).await;
        if let Err(e) = sent {
            error!(error = %e, "Failed to send microphone frame");
            self.fail(&e).await;
        }
    }

    /// Drive the session until it is closed.
    ///
    /// Starts the session, then feeds transport events, captured frames,
    /// playback completions and UI commands through [`handle`](Self::handle).
    /// Resources are released on every exit path. Returns the final state.
    pub async fn run(mut self) -> SessionState {
        let span = sherpa_telemetry::session_span(&self.config.model, &self.config.voice);
        async move {
            if self.start().await.is_ok() {
                info!("Live session started");
            }
            while self.state != SessionState::Closed {
                let event = self.next_event().await;
                self.handle(event).await;
            }
            self.state
        }
        .instrument(span)
        .await
    }

    /// Wait for the next event from any source.
    pub async fn next_event(&mut self) -> SessionEvent {
        let connection = self.connection.clone();
        tokio::select! {
            biased;
            command = self.commands_rx.recv() => {
                // Every handle is gone: nobody can close the session any more.
                SessionEvent::Command(command.unwrap_or(SessionCommand::Close))
            }
            Some(id) = self.ended_rx.recv() => SessionEvent::PlaybackEnded(id),
            event = next_transport_event(connection) => {
                SessionEvent::Transport(event.unwrap_or(TransportEvent::Closed { reason: None }))
            }
            Some(frame) = self.frames_rx.recv() => SessionEvent::CaptureFrame(frame),
        }
    }

    /// Tear the session down. Safe from every state and idempotent.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.release().await;
        self.transition(SessionState::Closed);
        info!("Live session closed");
    }

    async fn fail(&mut self, cause: &LiveError) {
        if self.transition(SessionState::Error) {
            warn!(error = %cause, "Live session entered error state");
        }
        self.release().await;
    }

    /// Release every held resource exactly once. Errors are logged.
    async fn release(&mut self) {
        if let Some(mic) = self.mic.as_deref_mut() {
            self.pipeline.stop(mic);
        }
        let mic = self.mic.take();
        let scheduler = self.scheduler.take();
        if mic.is_some() || scheduler.is_some() {
            let released = on_blocking_pool(move || {
                if let Some(mut mic) = mic {
                    if let Err(e) = mic.close() {
                        warn!(error = %e, "Failed to release microphone");
                    }
                }
                if let Some(mut scheduler) = scheduler {
                    scheduler.close();
                }
                Ok(())
            })
            .await;
            if let Err(e) = released {
                warn!(error = %e, "Failed to release audio devices");
            }
        }
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                warn!(error = %e, "Failed to close live connection");
            }
        }
    }

    fn transition(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(next) {
            debug!(from = %self.state, to = %next, "Ignoring state transition");
            return false;
        }
        debug!(from = %self.state, to = %next, "Session state changed");
        self.state = next;
        self.snapshot.send_modify(|s| s.status = next);
        true
    }
}

/// Run device work that may block on tokio's blocking pool.
async fn on_blocking_pool<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(work))
        .await
        .map_err(|e| LiveError::device(format!("audio device task failed: {}", e)))?
}

async fn next_transport_event(connection: Option<SharedConnection>) -> Option<TransportEvent> {
    match connection {
        Some(connection) => connection.next_event().await,
        None => std::future::pending().await,
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(mic) = self.mic.as_deref_mut() {
            self.pipeline.stop(mic);
        }
        if let Some(mut mic) = self.mic.take() {
            if let Err(e) = mic.close() {
                warn!(error = %e, "Failed to release microphone on drop");
            }
        }
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.close();
        }
        if let Some(connection) = self.connection.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move {
                        if let Err(e) = connection.close().await {
                            warn!(error = %e, "Failed to close live connection on drop");
                        }
                    });
                }
                Err(_) => warn!("Live connection dropped without a runtime to close it"),
            }
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state)
            .field("session_id", &self.session_id())
            .field("capturing", &self.pipeline.is_running())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
