//! Desktop audio devices backed by `cpal`.
//!
//! `cpal` streams are not `Send` on every platform, so each stream lives on
//! its own thread for as long as it is open. The thread builds the stream,
//! reports whether that worked, and parks until it is told to shut down.
//!
//! Devices are opened at their native rate and channel count. Captured audio
//! is downmixed and resampled to the session's input format; model audio is
//! mixed at the session's output rate and resampled to the device.

use super::resample::{MonoResampler, PlaybackPump, RESAMPLE_CHUNK, downmix};
use super::{
    AudioCapture, AudioRenderer, EndedSender, FrameSender, MicrophoneStream, Mixer, OutputContext,
};
use crate::audio::{AudioFormat, AudioFrame, PcmBuffer};
use crate::capture::FrameAssembler;
use crate::error::{LiveError, Result};
use crate::scheduler::UnitId;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// The device's preferred rate and channel count, always as f32 samples.
fn native_config(supported: cpal::SupportedStreamConfig) -> cpal::StreamConfig {
    if supported.sample_format() != cpal::SampleFormat::F32 {
        debug!(format = ?supported.sample_format(), "Requesting f32 samples from device");
    }
    cpal::StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    }
}

fn build_error(e: cpal::BuildStreamError) -> LiveError {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            LiveError::device("audio device is no longer available")
        }
        cpal::BuildStreamError::BackendSpecific { err }
            if err.description.to_lowercase().contains("permission")
                || err.description.to_lowercase().contains("denied") =>
        {
            LiveError::permission(err.description)
        }
        other => LiveError::device(other.to_string()),
    }
}

/// A cpal stream kept alive on a dedicated thread.
///
/// `spawn` waits until the stream is playing and `stop` joins the thread, so
/// both block the caller.
struct StreamThread {
    shutdown: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StreamThread {
    fn spawn<F>(name: &str, build: F) -> Result<Self>
    where
        F: FnOnce() -> Result<cpal::Stream> + Send + 'static,
    {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let stream = match build().and_then(|stream| {
                    stream.play().map_err(|e| LiveError::device(e.to_string()))?;
                    Ok(stream)
                }) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Returns on shutdown or when the owner is dropped.
                let _ = shutdown_rx.recv();
                drop(stream);
            })
            .map_err(|e| LiveError::device(format!("failed to spawn audio thread: {}", e)))?;

        let ready = ready_rx
            .recv()
            .map_err(|_| LiveError::device("audio thread exited before the stream started"))?;
        let mut thread = Self { shutdown: Some(shutdown_tx), handle: Some(handle) };
        if let Err(e) = ready {
            thread.stop();
            return Err(e);
        }
        Ok(thread)
    }

    fn stop(&mut self) {
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Audio stream thread panicked");
            }
        }
    }
}

impl Drop for StreamThread {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Default system microphone.
#[derive(Debug, Default)]
pub struct CpalCapture;

impl CpalCapture {
    pub fn new() -> Self {
        Self
    }
}

struct Tap {
    assembler: FrameAssembler,
    frames: FrameSender,
}

impl AudioCapture for CpalCapture {
    fn open(&self, format: &AudioFormat) -> Result<Box<dyn MicrophoneStream>> {
        let format = *format;
        let tap: Arc<Mutex<Option<Tap>>> = Arc::new(Mutex::new(None));
        let callback_tap = tap.clone();

        let thread = StreamThread::spawn("sherpa-capture", move || {
            let host = cpal::default_host();
            let device = host
                .default_input_device()
                .ok_or_else(|| LiveError::device("no microphone available"))?;
            let supported = device
                .default_input_config()
                .map_err(|e| LiveError::device(format!("microphone has no usable format: {}", e)))?;
            let config = native_config(supported);
            let channels = config.channels as usize;
            let mut resampler =
                MonoResampler::new(config.sample_rate.0, format.sample_rate, RESAMPLE_CHUNK)?;
            info!(
                device = ?device.name().ok(),
                device_rate = config.sample_rate.0,
                device_channels = channels,
                resampled = !resampler.is_passthrough(),
                "Using input device"
            );

            device
                .build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let samples = resampler.process(&downmix(data, channels));
                        let mut guard = callback_tap.lock();
                        let Some(tap) = guard.as_mut() else {
                            return;
                        };
                        let receiver_gone = tap
                            .assembler
                            .push(&samples)
                            .into_iter()
                            .any(|samples| tap.frames.send(AudioFrame::new(samples, format)).is_err());
                        if receiver_gone {
                            *guard = None;
                        }
                    },
                    |e| error!(error = %e, "Input stream error"),
                    None,
                )
                .map_err(build_error)
        })?;

        info!(rate = format.sample_rate, channels = format.channels, "Microphone opened");
        Ok(Box::new(CpalMicrophone { thread: Some(thread), tap }))
    }
}

/// An open cpal input stream.
pub struct CpalMicrophone {
    thread: Option<StreamThread>,
    tap: Arc<Mutex<Option<Tap>>>,
}

impl MicrophoneStream for CpalMicrophone {
    fn tap(&mut self, frame_size: usize, frames: FrameSender) -> Result<()> {
        if self.thread.is_none() {
            return Err(LiveError::device("microphone already closed"));
        }
        *self.tap.lock() = Some(Tap { assembler: FrameAssembler::new(frame_size), frames });
        Ok(())
    }

    fn untap(&mut self) {
        self.tap.lock().take();
    }

    fn close(&mut self) -> Result<()> {
        self.untap();
        if let Some(mut thread) = self.thread.take() {
            thread.stop();
            info!("Microphone released");
        }
        Ok(())
    }
}

/// Default system speaker.
#[derive(Debug, Default)]
pub struct CpalRenderer;

impl CpalRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl AudioRenderer for CpalRenderer {
    fn open(&self, format: &AudioFormat, ended: EndedSender) -> Result<Box<dyn OutputContext>> {
        let format = *format;
        let mixer = Arc::new(Mutex::new(Mixer::new(format.sample_rate)));
        let callback_mixer = mixer.clone();

        let thread = StreamThread::spawn("sherpa-playback", move || {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| LiveError::device("no speaker available"))?;
            let supported = device
                .default_output_config()
                .map_err(|e| LiveError::device(format!("speaker has no usable format: {}", e)))?;
            let config = native_config(supported);
            let channels = config.channels as usize;
            let resampler =
                MonoResampler::new(format.sample_rate, config.sample_rate.0, RESAMPLE_CHUNK)?;
            let (from, to) = resampler.rates();
            info!(
                device = ?device.name().ok(),
                from,
                to,
                device_channels = channels,
                "Using output device"
            );
            let mut pump = PlaybackPump::new(resampler, RESAMPLE_CHUNK);

            device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let finished = pump.fill(&mut callback_mixer.lock(), data, channels);
                        for id in finished {
                            let _ = ended.send(id);
                        }
                    },
                    |e| error!(error = %e, "Output stream error"),
                    None,
                )
                .map_err(build_error)
        })?;

        info!(rate = format.sample_rate, channels = format.channels, "Output context opened");
        Ok(Box::new(CpalOutput { thread: Some(thread), mixer }))
    }
}

/// An open cpal output stream with a sample-accurate clock.
pub struct CpalOutput {
    thread: Option<StreamThread>,
    mixer: Arc<Mutex<Mixer>>,
}

impl OutputContext for CpalOutput {
    fn current_time(&self) -> f64 {
        self.mixer.lock().current_time()
    }

    fn start(&mut self, unit: UnitId, buffer: &PcmBuffer, at: f64) -> Result<()> {
        if self.thread.is_none() {
            return Err(LiveError::device("output context already closed"));
        }
        self.mixer.lock().schedule(unit, buffer, at)
    }

    fn stop(&mut self, unit: UnitId) {
        if !self.mixer.lock().stop(unit) {
            debug!(%unit, "Unit already finished");
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut thread) = self.thread.take() {
            thread.stop();
            let pending = self.mixer.lock().len();
            if pending > 0 {
                warn!(pending, "Closing output with scheduled audio");
            }
            self.mixer.lock().clear();
            info!("Output context closed");
        }
        Ok(())
    }
}
