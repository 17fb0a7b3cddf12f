use crate::audio::PcmBuffer;
use crate::error::{LiveError, Result};
use crate::scheduler::UnitId;

struct Voice {
    id: UnitId,
    start_frame: u64,
    buffer: PcmBuffer,
}

impl Voice {
    fn end_frame(&self) -> u64 {
        self.start_frame + self.buffer.frames() as u64
    }
}

/// Sample-accurate timeline of scheduled buffers.
///
/// The clock is the number of frames rendered so far. A device callback
/// calls [`render`](Self::render) for every output block; units whose last
/// frame was rendered are returned so their owner can be told.
pub struct Mixer {
    sample_rate: u32,
    position: u64,
    voices: Vec<Voice>,
}

impl Mixer {
    /// Create an empty timeline at frame zero.
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate, position: 0, voices: Vec::new() }
    }

    /// Clock time in seconds.
    pub fn current_time(&self) -> f64 {
        self.position as f64 / self.sample_rate as f64
    }

    /// Place `buffer` on the timeline at `at` seconds.
    ///
    /// A start time the clock has already passed plays from the first sample
    /// at the next rendered frame.
    pub fn schedule(&mut self, id: UnitId, buffer: &PcmBuffer, at: f64) -> Result<()> {
        if buffer.sample_rate() != self.sample_rate {
            return Err(LiveError::device(format!(
                "buffer at {}Hz cannot play on a {}Hz output",
                buffer.sample_rate(),
                self.sample_rate
            )));
        }
        let start_frame =
            ((at.max(0.0) * self.sample_rate as f64).round() as u64).max(self.position);
        self.voices.push(Voice { id, start_frame, buffer: buffer.clone() });
        Ok(())
    }

    /// Remove a unit from the timeline.
    pub fn stop(&mut self, id: UnitId) -> bool {
        let before = self.voices.len();
        self.voices.retain(|voice| voice.id != id);
        self.voices.len() != before
    }

    /// Remove every unit.
    pub fn clear(&mut self) {
        self.voices.clear();
    }

    /// Number of units on the timeline.
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    /// Whether the timeline is empty.
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Mix the next block into `out` (interleaved, `channels` wide) and
    /// advance the clock.
    pub fn render(&mut self, out: &mut [f32], channels: usize) -> Vec<UnitId> {
        out.fill(0.0);
        if channels == 0 {
            return Vec::new();
        }

        let frames = out.len() / channels;
        let block_start = self.position;
        let block_end = block_start + frames as u64;

        for voice in &self.voices {
            let from = voice.start_frame.max(block_start);
            let to = voice.end_frame().min(block_end);
            let planes = voice.buffer.num_channels();
            if from >= to || planes == 0 {
                continue;
            }
            for frame in from..to {
                let src = (frame - voice.start_frame) as usize;
                let dst = (frame - block_start) as usize * channels;
                for ch in 0..channels {
                    let plane = voice.buffer.channel(ch.min(planes - 1)).unwrap_or_default();
                    out[dst + ch] += plane[src];
                }
            }
        }

        self.position = block_end;
        let mut finished = Vec::new();
        self.voices.retain(|voice| {
            let done = voice.end_frame() <= block_end;
            if done {
                finished.push(voice.id);
            }
            !done
        });
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_places_unit_at_start_time() {
        let mut mixer = Mixer::new(4);
        mixer.schedule(UnitId(0), &PcmBuffer::mono(vec![0.5, 0.5], 4), 0.5).unwrap();

        let mut out = vec![0.0; 4];
        let finished = mixer.render(&mut out, 1);
        assert_eq!(out, vec![0.0, 0.0, 0.5, 0.5]);
        assert_eq!(finished, vec![UnitId(0)]);
        assert_eq!(mixer.current_time(), 1.0);
    }

    #[test]
    fn test_late_unit_plays_from_first_sample() {
        let mut mixer = Mixer::new(4);
        let mut out = vec![0.0; 4];
        mixer.render(&mut out, 1);
        assert_eq!(mixer.current_time(), 1.0);

        mixer.schedule(UnitId(0), &PcmBuffer::mono(vec![0.1, 0.2, 0.3, 0.4], 4), 0.5).unwrap();
        let finished = mixer.render(&mut out, 1);
        assert_eq!(out, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(finished, vec![UnitId(0)]);
    }

    #[test]
    fn test_render_spans_blocks() {
        let mut mixer = Mixer::new(4);
        mixer.schedule(UnitId(3), &PcmBuffer::mono(vec![0.1, 0.2, 0.3], 4), 0.0).unwrap();

        let mut out = vec![0.0; 2];
        assert!(mixer.render(&mut out, 1).is_empty());
        assert_eq!(out, vec![0.1, 0.2]);
        assert_eq!(mixer.render(&mut out, 1), vec![UnitId(3)]);
        assert_eq!(out, vec![0.3, 0.0]);
    }

    #[test]
    fn test_mono_fans_out_to_stereo() {
        let mut mixer = Mixer::new(2);
        mixer.schedule(UnitId(0), &PcmBuffer::mono(vec![0.25], 2), 0.0).unwrap();

        let mut out = vec![0.0; 2];
        mixer.render(&mut out, 2);
        assert_eq!(out, vec![0.25, 0.25]);
    }

    #[test]
    fn test_stop_silences_unit() {
        let mut mixer = Mixer::new(4);
        mixer.schedule(UnitId(1), &PcmBuffer::mono(vec![1.0; 4], 4), 0.0).unwrap();
        assert!(mixer.stop(UnitId(1)));

        let mut out = vec![0.0; 4];
        assert!(mixer.render(&mut out, 1).is_empty());
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_rejects_rate_mismatch() {
        let mut mixer = Mixer::new(24000);
        assert!(mixer.schedule(UnitId(0), &PcmBuffer::mono(vec![0.0], 16000), 0.0).is_err());
    }
}
