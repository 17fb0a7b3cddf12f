//! Microphone capture pipeline.
//!
//! Frames tapped from the microphone are measured for the volume meter and,
//! unless the session is muted, encoded for transmission. Muting never stops
//! the tap so the device stays warm.

use crate::audio::AudioFormat;
use crate::codec::{MediaBlob, encode_blob};
use crate::device::{FrameSender, MicrophoneStream};
use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// Root mean square of a frame, `0.0` for an empty frame.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Slices arbitrary device blocks into frames of a fixed size.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    buffer: Vec<f32>,
    frame_size: usize,
}

impl FrameAssembler {
    /// Create an assembler emitting `frame_size`-sample frames.
    pub fn new(frame_size: usize) -> Self {
        Self { buffer: Vec::with_capacity(frame_size), frame_size: frame_size.max(1) }
    }

    /// Push new samples and return every frame that became complete.
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.buffer.extend_from_slice(samples);
        let complete = self.buffer.len() / self.frame_size;
        if complete == 0 {
            return Vec::new();
        }
        let rest = self.buffer.split_off(complete * self.frame_size);
        let full = std::mem::replace(&mut self.buffer, rest);
        full.chunks_exact(self.frame_size).map(<[f32]>::to_vec).collect()
    }

    /// Samples waiting for a frame to fill up.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Result of processing one captured frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOutcome {
    /// Frame loudness in `[0, 1]`, reported whether muted or not.
    pub volume: f32,
    /// Encoded frame to send, `None` while muted.
    pub outbound: Option<MediaBlob>,
}

/// Frame counters of a capture pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub frames_encoded: u64,
    pub frames_suppressed: u64,
}

/// Taps the microphone, meters every frame and encodes unmuted ones.
#[derive(Debug)]
pub struct CapturePipeline {
    format: AudioFormat,
    frame_size: usize,
    muted: Arc<AtomicBool>,
    tapped: bool,
    stats: CaptureStats,
}

impl CapturePipeline {
    /// Create a pipeline sharing the session's mute flag.
    pub fn new(format: AudioFormat, frame_size: usize, muted: Arc<AtomicBool>) -> Self {
        Self { format, frame_size, muted, tapped: false, stats: CaptureStats::default() }
    }

    /// Tap `mic`; frames arrive on `frames`.
    pub fn start(&mut self, mic: &mut dyn MicrophoneStream, frames: FrameSender) -> Result<()> {
        if self.tapped {
            return Ok(());
        }
        mic.tap(self.frame_size, frames)?;
        self.tapped = true;
        debug!(frame_size = self.frame_size, rate = self.format.sample_rate, "Capture started");
        Ok(())
    }

    /// Disconnect the tap. Idempotent.
    pub fn stop(&mut self, mic: &mut dyn MicrophoneStream) {
        if !self.tapped {
            return;
        }
        mic.untap();
        self.tapped = false;
        debug!(stats = ?self.stats, "Capture stopped");
    }

    /// Meter one frame and encode it unless muted.
    pub fn process(&mut self, samples: &[f32]) -> CaptureOutcome {
        self.stats.frames_captured += 1;
        let volume = rms(samples).clamp(0.0, 1.0);

        let outbound = if self.is_muted() {
            self.stats.frames_suppressed += 1;
            None
        } else {
            self.stats.frames_encoded += 1;
            Some(encode_blob(samples, &self.format))
        };
        trace!(volume, sent = outbound.is_some(), "Processed capture frame");

        CaptureOutcome { volume, outbound }
    }

    /// Whether transmission is currently suppressed.
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Whether the microphone is tapped.
    pub fn is_running(&self) -> bool {
        self.tapped
    }

    /// Frame counters so far.
    pub fn stats(&self) -> CaptureStats {
        self.stats
    }
}
