//! Audio format definitions and buffer types.

use serde::{Deserialize, Serialize};

/// Samples per captured microphone frame.
pub const CAPTURE_FRAME_SIZE: usize = 4096;

/// Sample rate of outbound microphone audio.
pub const INPUT_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of inbound model audio.
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// PCM stream format: sample rate and channel count of 16-bit audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate in Hz (e.g., 24000, 16000).
    pub sample_rate: u32,
    /// Number of audio channels (1 = mono).
    pub channels: u16,
}

impl AudioFormat {
    /// Create a new audio format.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self { sample_rate, channels }
    }

    /// Microphone format: PCM16 mono at 16kHz.
    pub fn pcm16_16khz() -> Self {
        Self::new(INPUT_SAMPLE_RATE, 1)
    }

    /// Model output format: PCM16 mono at 24kHz.
    pub fn pcm16_24khz() -> Self {
        Self::new(OUTPUT_SAMPLE_RATE, 1)
    }

    /// Mime tag declared alongside PCM payloads in this format.
    pub fn mime_type(&self) -> String {
        format!("audio/pcm;rate={}", self.sample_rate)
    }

    /// Duration in seconds of `frames` sample frames.
    pub fn frames_to_secs(&self, frames: usize) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        frames as f64 / self.sample_rate as f64
    }
}

/// One captured microphone frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Mono float samples in `[-1, 1]`.
    pub samples: Vec<f32>,
    /// Capture format.
    pub format: AudioFormat,
}

impl AudioFrame {
    /// Create a new frame.
    pub fn new(samples: Vec<f32>, format: AudioFormat) -> Self {
        Self { samples, format }
    }

    /// Number of samples in the frame.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the frame holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Decoded audio ready for playback, one plane per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Create a buffer from per-channel planes.
    ///
    /// All planes are expected to have the same length.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self { channels, sample_rate }
    }

    /// Create a mono buffer.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(vec![samples], sample_rate)
    }

    /// A mono buffer of silence lasting `secs` seconds.
    pub fn silence(secs: f64, sample_rate: u32) -> Self {
        let frames = (secs * sample_rate as f64).round() as usize;
        Self::mono(vec![0.0; frames], sample_rate)
    }

    /// Samples of one channel.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Sample frames per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Playback duration in seconds.
    pub fn duration(&self) -> f64 {
        AudioFormat::new(self.sample_rate, self.num_channels() as u16).frames_to_secs(self.frames())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type() {
        assert_eq!(AudioFormat::pcm16_16khz().mime_type(), "audio/pcm;rate=16000");
    }

    #[test]
    fn test_buffer_duration() {
        let buffer = PcmBuffer::silence(0.5, OUTPUT_SAMPLE_RATE);
        assert_eq!(buffer.frames(), 12000);
        assert!((buffer.duration() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = PcmBuffer::new(Vec::new(), OUTPUT_SAMPLE_RATE);
        assert_eq!(buffer.frames(), 0);
        assert_eq!(buffer.duration(), 0.0);
    }
}
