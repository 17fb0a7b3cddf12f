//! Sample-rate conversion between session formats and device formats.
//!
//! Devices usually run at 44.1 or 48 kHz while the session speaks 16 kHz in
//! and 24 kHz out. Everything here is mono; channel fan-in and fan-out happen
//! at the device edge.

use super::Mixer;
use crate::error::{LiveError, Result};
use crate::scheduler::UnitId;
use rubato::audioadapter::Adapter;
use rubato::{Fft, FixedSync, Resampler};
use std::collections::VecDeque;
use tracing::warn;

/// Frames handed to the FFT resampler per call.
pub const RESAMPLE_CHUNK: usize = 1024;

struct MonoSlice<'a>(&'a [f32]);

impl<'a> Adapter<'a, f32> for MonoSlice<'a> {
    fn channels(&self) -> usize {
        1
    }

    fn frames(&self) -> usize {
        self.0.len()
    }

    fn read_sample(&self, channel: usize, frame: usize) -> Option<f32> {
        if channel != 0 {
            return None;
        }
        self.0.get(frame).copied()
    }

    unsafe fn read_sample_unchecked(&self, _channel: usize, frame: usize) -> f32 {
        unsafe { *self.0.get_unchecked(frame) }
    }
}

/// Streaming mono resampler. Passes audio through when both rates match.
pub struct MonoResampler {
    fft: Option<Fft<f32>>,
    pending: Vec<f32>,
    from: u32,
    to: u32,
}

impl MonoResampler {
    /// Convert from `from` Hz to `to` Hz in chunks of `chunk` input frames.
    pub fn new(from: u32, to: u32, chunk: usize) -> Result<Self> {
        let fft = if from == to {
            None
        } else {
            let fft = Fft::<f32>::new(
                from as usize,
                to as usize,
                chunk.max(1),
                1,
                1,
                FixedSync::Input,
            )
            .map_err(|e| {
                LiveError::device(format!("cannot resample {}Hz to {}Hz: {}", from, to, e))
            })?;
            Some(fft)
        };
        Ok(Self { fft, pending: Vec::with_capacity(chunk * 2), from, to })
    }

    /// Whether samples are converted at all.
    pub fn is_passthrough(&self) -> bool {
        self.fft.is_none()
    }

    /// Input and output rates in Hz.
    pub fn rates(&self) -> (u32, u32) {
        (self.from, self.to)
    }

    /// Push input samples and return every output sample that became ready.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(fft) = self.fft.as_mut() else {
            return samples.to_vec();
        };
        self.pending.extend_from_slice(samples);

        let mut out = Vec::new();
        loop {
            let needed = fft.input_frames_next();
            if needed == 0 || self.pending.len() < needed {
                break;
            }
            let chunk: Vec<f32> = self.pending.drain(..needed).collect();
            match fft.process(&MonoSlice(&chunk), 0, None) {
                Ok(resampled) => {
                    out.extend((0..resampled.frames()).filter_map(|i| resampled.read_sample(0, i)))
                }
                Err(e) => {
                    warn!(error = %e, from = self.from, to = self.to, "Resampling failed");
                    break;
                }
            }
        }
        out
    }
}

/// Average interleaved `channels`-wide frames down to mono.
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks_exact(channels).map(|frame| frame.iter().sum::<f32>() / channels as f32).collect()
}

/// Pulls session-rate audio out of a [`Mixer`] and delivers it at the
/// device rate.
///
/// The mixer is rendered one block at a time, so its clock runs at most a
/// block plus the resampler latency ahead of the speaker.
pub struct PlaybackPump {
    resampler: MonoResampler,
    block: Vec<f32>,
    queue: VecDeque<f32>,
}

impl PlaybackPump {
    /// Render the mixer in blocks of `block_frames` session-rate frames.
    pub fn new(resampler: MonoResampler, block_frames: usize) -> Self {
        Self { resampler, block: vec![0.0; block_frames.max(1)], queue: VecDeque::new() }
    }

    /// Fill `out` (interleaved, `channels` wide) and return the units that
    /// finished on the mixer while doing so.
    pub fn fill(&mut self, mixer: &mut Mixer, out: &mut [f32], channels: usize) -> Vec<UnitId> {
        out.fill(0.0);
        let mut finished = Vec::new();
        if channels == 0 {
            return finished;
        }

        let frames = out.len() / channels;
        while self.queue.len() < frames {
            finished.extend(mixer.render(&mut self.block, 1));
            let produced = self.resampler.process(&self.block);
            if produced.is_empty() && !self.resampler.is_passthrough() {
                break;
            }
            self.queue.extend(produced);
        }

        for frame in out.chunks_exact_mut(channels) {
            let sample = self.queue.pop_front().unwrap_or(0.0);
            frame.fill(sample);
        }
        finished
    }

    /// Device-rate samples rendered but not yet played.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PcmBuffer;

    #[test]
    fn test_passthrough_when_rates_match() {
        let mut resampler = MonoResampler::new(16000, 16000, RESAMPLE_CHUNK).unwrap();
        assert!(resampler.is_passthrough());
        assert_eq!(resampler.process(&[0.1, 0.2, 0.3]), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_downsamples_48k_to_16k() {
        let mut resampler = MonoResampler::new(48000, 16000, RESAMPLE_CHUNK).unwrap();
        assert!(!resampler.is_passthrough());

        let mut produced = 0;
        for _ in 0..48 {
            produced += resampler.process(&[0.0; 1000]).len();
        }
        // One second of input, minus whatever is still buffered.
        assert!((16000 - RESAMPLE_CHUNK..=16000 + 4).contains(&produced), "produced {}", produced);
    }

    #[test]
    fn test_buffers_until_a_chunk_is_ready() {
        let mut resampler = MonoResampler::new(44100, 16000, RESAMPLE_CHUNK).unwrap();
        assert!(resampler.process(&[0.0; 100]).is_empty());
    }

    #[test]
    fn test_downmix() {
        assert_eq!(downmix(&[1.0, 0.0, 0.5, -0.5], 2), vec![0.5, 0.0]);
        assert_eq!(downmix(&[0.25, 0.75], 1), vec![0.25, 0.75]);
    }

    #[test]
    fn test_pump_fans_out_and_reports_finished() {
        let mut mixer = Mixer::new(4);
        mixer.schedule(UnitId(5), &PcmBuffer::mono(vec![0.5, 0.25], 4), 0.0).unwrap();
        let mut pump = PlaybackPump::new(MonoResampler::new(4, 4, 4).unwrap(), 4);

        let mut out = vec![0.0; 4];
        let finished = pump.fill(&mut mixer, &mut out, 2);
        assert_eq!(out, vec![0.5, 0.5, 0.25, 0.25]);
        assert_eq!(finished, vec![UnitId(5)]);
        assert_eq!(pump.queued(), 2);
        assert_eq!(mixer.current_time(), 1.0);
    }

    #[test]
    fn test_pump_upsamples_into_device_blocks() {
        let mut mixer = Mixer::new(24000);
        let mut pump =
            PlaybackPump::new(MonoResampler::new(24000, 48000, RESAMPLE_CHUNK).unwrap(), RESAMPLE_CHUNK);

        let mut out = vec![1.0; 480 * 2];
        pump.fill(&mut mixer, &mut out, 2);
        assert!(out.iter().all(|s| *s == 0.0));
        assert!(mixer.current_time() > 0.0);
    }
}
