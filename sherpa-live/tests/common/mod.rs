//! In-memory transport and devices for driving a session without hardware
//! or network.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sherpa_live::codec::encode_blob;
use sherpa_live::device::{EndedSender, FrameSender};
use sherpa_live::{
    AudioCapture, AudioFormat, AudioFrame, AudioRenderer, LiveConfig, LiveConnection, LiveError,
    LiveModel, MediaBlob, MicrophoneStream, OutputContext, PcmBuffer, Result, ServerMessage,
    SessionController, SessionHandle, TransportEvent, UnitId,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Shared record of everything the fakes observed.
#[derive(Default)]
pub struct Recorder {
    pub connects: AtomicUsize,
    pub connection_closes: AtomicUsize,
    pub sent: Mutex<Vec<MediaBlob>>,

    pub mic_opens: AtomicUsize,
    pub mic_taps: AtomicUsize,
    pub mic_untaps: AtomicUsize,
    pub mic_closes: AtomicUsize,
    pub mic_frames: Mutex<Option<FrameSender>>,

    pub output_opens: AtomicUsize,
    pub output_closes: AtomicUsize,
    pub clock: Mutex<f64>,
    pub started: Mutex<Vec<(UnitId, f64, f64)>>,
    pub stopped: Mutex<Vec<UnitId>>,
    pub ended: Mutex<Option<EndedSender>>,
}

impl Recorder {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn connection_closes(&self) -> usize {
        self.connection_closes.load(Ordering::SeqCst)
    }

    pub fn mic_closes(&self) -> usize {
        self.mic_closes.load(Ordering::SeqCst)
    }

    pub fn output_closes(&self) -> usize {
        self.output_closes.load(Ordering::SeqCst)
    }

    pub fn sent_len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn set_clock(&self, secs: f64) {
        *self.clock.lock() = secs;
    }

    pub fn starts(&self) -> Vec<f64> {
        self.started.lock().iter().map(|(_, at, _)| *at).collect()
    }

    /// Deliver a frame as the microphone callback would.
    pub fn speak(&self, samples: Vec<f32>) -> bool {
        match self.mic_frames.lock().as_ref() {
            Some(frames) => {
                frames.send(AudioFrame::new(samples, AudioFormat::pcm16_16khz())).is_ok()
            }
            None => false,
        }
    }
}

/// A connection whose inbound events are scripted by the test.
pub struct FakeConnection {
    recorder: Arc<Recorder>,
    connected: AtomicBool,
    events: tokio::sync::Mutex<mpsc::UnboundedReceiver<TransportEvent>>,
    fail_sends: bool,
}

#[async_trait]
impl LiveConnection for FakeConnection {
    fn session_id(&self) -> &str {
        "fake-session"
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_media(&self, blob: MediaBlob) -> Result<()> {
        if self.fail_sends {
            return Err(LiveError::connection("socket reset"));
        }
        self.recorder.sent.lock().push(blob);
        Ok(())
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        self.events.lock().await.recv().await
    }

    async fn close(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.recorder.connection_closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

pub struct FakeModel {
    recorder: Arc<Recorder>,
    events: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
    fail_connect: bool,
    fail_sends: bool,
}

#[async_trait]
impl LiveModel for FakeModel {
    fn provider(&self) -> &str {
        "fake"
    }

    async fn connect(&self, _config: &LiveConfig) -> Result<Arc<dyn LiveConnection>> {
        self.recorder.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(LiveError::connection("handshake refused"));
        }
        let events = self.events.lock().take().ok_or(LiveError::SessionClosed)?;
        Ok(Arc::new(FakeConnection {
            recorder: self.recorder.clone(),
            connected: AtomicBool::new(true),
            events: tokio::sync::Mutex::new(events),
            fail_sends: self.fail_sends,
        }))
    }
}

pub struct FakeCapture {
    recorder: Arc<Recorder>,
    deny: bool,
    gate: Option<Mutex<std::sync::mpsc::Receiver<()>>>,
}

impl AudioCapture for FakeCapture {
    fn open(&self, _format: &AudioFormat) -> Result<Box<dyn MicrophoneStream>> {
        if let Some(gate) = &self.gate {
            // Blocks the calling thread like a slow device would.
            let _ = gate.lock().recv();
        }
        if self.deny {
            return Err(LiveError::permission("microphone access denied"));
        }
        self.recorder.mic_opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeMicrophone { recorder: self.recorder.clone() }))
    }
}

pub struct FakeMicrophone {
    recorder: Arc<Recorder>,
}

impl MicrophoneStream for FakeMicrophone {
    fn tap(&mut self, _frame_size: usize, frames: FrameSender) -> Result<()> {
        self.recorder.mic_taps.fetch_add(1, Ordering::SeqCst);
        *self.recorder.mic_frames.lock() = Some(frames);
        Ok(())
    }

    fn untap(&mut self) {
        self.recorder.mic_untaps.fetch_add(1, Ordering::SeqCst);
        *self.recorder.mic_frames.lock() = None;
    }

    fn close(&mut self) -> Result<()> {
        self.recorder.mic_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeRenderer {
    recorder: Arc<Recorder>,
}

impl AudioRenderer for FakeRenderer {
    fn open(&self, _format: &AudioFormat, ended: EndedSender) -> Result<Box<dyn OutputContext>> {
        self.recorder.output_opens.fetch_add(1, Ordering::SeqCst);
        *self.recorder.ended.lock() = Some(ended);
        Ok(Box::new(FakeOutput { recorder: self.recorder.clone() }))
    }
}

/// Output context whose clock only moves when the test moves it.
pub struct FakeOutput {
    recorder: Arc<Recorder>,
}

impl OutputContext for FakeOutput {
    fn current_time(&self) -> f64 {
        *self.recorder.clock.lock()
    }

    fn start(&mut self, unit: UnitId, buffer: &PcmBuffer, at: f64) -> Result<()> {
        self.recorder.started.lock().push((unit, at, buffer.duration()));
        Ok(())
    }

    fn stop(&mut self, unit: UnitId) {
        self.recorder.stopped.lock().push(unit);
    }

    fn close(&mut self) -> Result<()> {
        self.recorder.output_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Builder for a controller wired to fakes.
#[derive(Default)]
pub struct Rig {
    deny_microphone: bool,
    fail_connect: bool,
    fail_sends: bool,
    microphone_gate: Option<std::sync::mpsc::Receiver<()>>,
}

pub struct Session {
    pub controller: SessionController,
    pub handle: SessionHandle,
    pub recorder: Arc<Recorder>,
    pub server: mpsc::UnboundedSender<TransportEvent>,
}

impl Rig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny_microphone(mut self) -> Self {
        self.deny_microphone = true;
        self
    }

    pub fn fail_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn fail_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    /// Make opening the microphone block until `gate` receives a value.
    pub fn gate_microphone(mut self, gate: std::sync::mpsc::Receiver<()>) -> Self {
        self.microphone_gate = Some(gate);
        self
    }

    pub fn build(self) -> Session {
        let recorder = Arc::new(Recorder::default());
        let (server, events) = mpsc::unbounded_channel();
        let model = Arc::new(FakeModel {
            recorder: recorder.clone(),
            events: Mutex::new(Some(events)),
            fail_connect: self.fail_connect,
            fail_sends: self.fail_sends,
        });
        let (controller, handle) = SessionController::new(
            LiveConfig::default(),
            model,
            Box::new(FakeCapture {
                recorder: recorder.clone(),
                deny: self.deny_microphone,
                gate: self.microphone_gate.map(Mutex::new),
            }),
            Box::new(FakeRenderer { recorder: recorder.clone() }),
        );
        Session { controller, handle, recorder, server }
    }
}

/// A base64 model audio chunk of `secs` seconds at 24 kHz.
pub fn model_chunk(secs: f64) -> ServerMessage {
    let frames = (secs * 24_000.0).round() as usize;
    let samples: Vec<f32> = (0..frames).map(|i| ((i % 48) as f32 / 48.0) - 0.5).collect();
    ServerMessage::audio(encode_blob(&samples, &AudioFormat::pcm16_24khz()).data)
}

/// A microphone frame with constant amplitude.
pub fn loud_frame(amplitude: f32) -> AudioFrame {
    AudioFrame::new(vec![amplitude; 4096], AudioFormat::pcm16_16khz())
}
