//! PCM16 codec between float samples and the base64 wire payload.
//!
//! Outbound microphone frames are quantized to signed 16-bit little-endian
//! integers and base64-armored. Inbound model audio goes the other way and is
//! deinterleaved into one plane per channel.

use crate::audio::{AudioFormat, PcmBuffer};
use crate::error::{LiveError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

const I16_SCALE: f32 = 32768.0;

/// An encoded outbound audio frame, shaped like the Live API media chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    /// Base64 of 16-bit little-endian PCM.
    pub data: String,
    /// Mime tag, e.g. `audio/pcm;rate=16000`.
    pub mime_type: String,
}

/// Quantize one sample.
///
/// No clamping: values outside `[-1, 1)` wrap in two's complement, so `1.0`
/// becomes `-32768`.
pub fn quantize(sample: f32) -> i16 {
    (sample * I16_SCALE).round() as i32 as i16
}

/// Convert one 16-bit sample back to float.
pub fn dequantize(sample: i16) -> f32 {
    sample as f32 / I16_SCALE
}

/// Encode float samples as 16-bit little-endian PCM bytes.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        data.extend_from_slice(&quantize(sample).to_le_bytes());
    }
    data
}

/// Encode float samples into a base64 media blob tagged with `format`.
pub fn encode_blob(samples: &[f32], format: &AudioFormat) -> MediaBlob {
    MediaBlob { data: STANDARD.encode(encode_pcm16(samples)), mime_type: format.mime_type() }
}

/// Decode 16-bit little-endian PCM bytes into per-channel float planes.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<PcmBuffer> {
    if channels == 0 {
        return Err(LiveError::decode("channel count must be at least 1"));
    }
    let stride = 2 * channels as usize;
    if bytes.len() % stride != 0 {
        return Err(LiveError::decode(format!(
            "payload of {} bytes is not a multiple of {} ({} channel(s) of PCM16)",
            bytes.len(),
            stride,
            channels
        )));
    }

    let frame_count = bytes.len() / stride;
    let channels = channels as usize;
    let mut planes = vec![Vec::with_capacity(frame_count); channels];
    for (flat_index, pair) in bytes.chunks_exact(2).enumerate() {
        let sample = i16::from_le_bytes([pair[0], pair[1]]);
        planes[flat_index % channels].push(dequantize(sample));
    }

    Ok(PcmBuffer::new(planes, sample_rate))
}

/// Decode a base64 PCM16 payload.
pub fn decode_base64(data: &str, format: &AudioFormat) -> Result<PcmBuffer> {
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| LiveError::decode(format!("invalid base64 audio payload: {}", e)))?;
    decode_pcm16(&bytes, format.sample_rate, format.channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_rounds() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(0.5), 16384);
        assert_eq!(quantize(-1.0), -32768);
        assert_eq!(quantize(1.0 / 65536.0 * 3.0), 2);
    }

    #[test]
    fn test_quantize_wraps_on_overflow() {
        assert_eq!(quantize(1.0), i16::MIN);
    }

    #[test]
    fn test_encode_little_endian() {
        let bytes = encode_pcm16(&[0.5, -0.5]);
        assert_eq!(bytes, vec![0x00, 0x40, 0x00, 0xC0]);
    }

    #[test]
    fn test_encode_blob_mime_and_base64() {
        let blob = encode_blob(&[0.0, 0.0], &AudioFormat::pcm16_16khz());
        assert_eq!(blob.mime_type, "audio/pcm;rate=16000");
        assert_eq!(blob.data, "AAAAAA==");
    }

    #[test]
    fn test_decode_mono() {
        let buffer = decode_pcm16(&[0x00, 0x01, 0x00, 0x80], 24000, 1).unwrap();
        assert_eq!(buffer.num_channels(), 1);
        assert_eq!(buffer.channel(0).unwrap(), &[256.0 / 32768.0, -1.0]);
    }

    #[test]
    fn test_decode_deinterleaves_stereo() {
        let bytes = encode_pcm16(&[0.25, -0.25, 0.5, -0.5]);
        let buffer = decode_pcm16(&bytes, 24000, 2).unwrap();
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.channel(0).unwrap(), &[0.25, 0.5]);
        assert_eq!(buffer.channel(1).unwrap(), &[-0.25, -0.5]);
    }

    #[test]
    fn test_decode_rejects_partial_frame() {
        assert!(matches!(decode_pcm16(&[0, 1, 2], 24000, 1), Err(LiveError::Decode(_))));
        assert!(matches!(decode_pcm16(&[0, 1, 2, 3, 4, 5], 24000, 2), Err(LiveError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_zero_channels() {
        assert!(matches!(decode_pcm16(&[], 24000, 0), Err(LiveError::Decode(_))));
    }

    #[test]
    fn test_decode_base64_invalid() {
        let err = decode_base64("not base64!", &AudioFormat::pcm16_24khz()).unwrap_err();
        assert!(matches!(err, LiveError::Decode(_)));
    }

    #[test]
    fn test_decode_empty_payload() {
        let buffer = decode_base64("", &AudioFormat::pcm16_24khz()).unwrap();
        assert_eq!(buffer.frames(), 0);
    }
}
