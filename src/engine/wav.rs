//! Canonical WAV encoder
//!
//! Serializes an [`AudioBuffer`] as a 44-byte-header RIFF/WAVE file holding
//! interleaved 16-bit signed PCM. The layout is fixed so any browser, OS or
//! player can open the result:
//!
//! ```text
//! 0   "RIFF"          4   u32 file length - 8   8   "WAVE"
//! 12  "fmt "          16  u32 16                20  u16 1 (PCM)
//! 22  u16 channels    24  u32 sample rate       28  u32 byte rate
//! 32  u16 block align 34  u16 16                36  "data"
//! 40  u32 data size   44  samples, frame-major, channel-minor
//! ```
//!
//! All integers are little-endian. Encoding is deterministic.

use sha2::{Digest, Sha256};

use crate::engine::buffer::AudioBuffer;
use crate::error::{ReverieError, Result};

/// Size of the canonical header in bytes
pub const WAV_HEADER_LEN: usize = 44;

/// Bits per encoded sample
pub const BITS_PER_SAMPLE: u16 = 16;

const BYTES_PER_SAMPLE: u32 = (BITS_PER_SAMPLE / 8) as u32;

/// An encoded file plus its content hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAsset {
    /// Complete WAV file bytes
    pub bytes: Vec<u8>,
    /// Lowercase hex SHA-256 of `bytes`
    pub content_hash: String,
}

impl EncodedAsset {
    /// Wrap encoded bytes, computing their hash
    pub fn new(bytes: Vec<u8>) -> Self {
        let content_hash = format!("{:x}", Sha256::digest(&bytes));
        Self {
            bytes,
            content_hash,
        }
    }
}

/// Quantize one float sample to 16-bit signed PCM
///
/// Negative values scale by 32768 and positive by 32767, so -1.0 and 1.0 hit
/// the exact extremes. Out-of-range input clamps rather than wrapping.
#[inline]
pub fn quantize_i16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    let scaled = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
    scaled.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Encode a buffer as a canonical 16-bit PCM WAV file
///
/// # Errors
/// * `EncodeFailed` - The data chunk would not fit the 32-bit size fields
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let channels = u16::try_from(buffer.channel_count()).map_err(|_| ReverieError::EncodeFailed {
        reason: format!("{} channels exceed the WAV channel field", buffer.channel_count()),
    })?;

    let data_len = (buffer.frame_count() as u64)
        .checked_mul(channels as u64 * BYTES_PER_SAMPLE as u64)
        .filter(|len| *len + (WAV_HEADER_LEN as u64 - 8) <= u32::MAX as u64)
        .ok_or_else(|| ReverieError::EncodeFailed {
            reason: format!(
                "{} frames x {} channels do not fit in a WAV file",
                buffer.frame_count(),
                channels
            ),
        })? as u32;

    let block_align = channels * BITS_PER_SAMPLE / 8;
    let byte_rate = buffer
        .sample_rate()
        .checked_mul(block_align as u32)
        .ok_or_else(|| ReverieError::EncodeFailed {
            reason: format!("byte rate overflows at {} Hz", buffer.sample_rate()),
        })?;

    let mut out = Vec::new();
    out.try_reserve_exact(WAV_HEADER_LEN + data_len as usize)
        .map_err(|e| ReverieError::EncodeFailed {
            reason: format!("cannot allocate output: {}", e),
        })?;

    // RIFF header
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(data_len + WAV_HEADER_LEN as u32 - 8).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt chunk
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&buffer.sample_rate().to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data chunk
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for frame in 0..buffer.frame_count() {
        for channel in buffer.channels() {
            out.extend_from_slice(&quantize_i16(channel[frame]).to_le_bytes());
        }
    }

    Ok(out)
}

/// Encode a buffer and hash the result
pub fn encode_asset(buffer: &AudioBuffer) -> Result<EncodedAsset> {
    encode_wav(buffer).map(EncodedAsset::new)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    #[test]
    fn test_header_layout_stereo() {
        let buffer = AudioBuffer::filled(44100, 2, 10, 0.0).unwrap();
        let bytes = encode_wav(&buffer).unwrap();

        assert_eq!(bytes.len(), 44 + 10 * 2 * 2);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32_at(&bytes, 4), bytes.len() as u32 - 8);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u32_at(&bytes, 16), 16);
        assert_eq!(u16_at(&bytes, 20), 1);
        assert_eq!(u16_at(&bytes, 22), 2);
        assert_eq!(u32_at(&bytes, 24), 44100);
        assert_eq!(u32_at(&bytes, 28), 44100 * 2 * 2);
        assert_eq!(u16_at(&bytes, 32), 4);
        assert_eq!(u16_at(&bytes, 34), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32_at(&bytes, 40), 40);
    }

    #[test]
    fn test_samples_are_interleaved_frame_major() {
        let buffer = AudioBuffer::new(8000, vec![vec![1.0, 0.0], vec![-1.0, 0.5]]).unwrap();
        let bytes = encode_wav(&buffer).unwrap();

        let samples: Vec<i16> = bytes[44..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(samples, vec![32767, -32768, 0, 16384]);
    }

    #[test]
    fn test_quantize_extremes_and_clamping() {
        assert_eq!(quantize_i16(1.0), 32767);
        assert_eq!(quantize_i16(-1.0), -32768);
        assert_eq!(quantize_i16(2.5), 32767);
        assert_eq!(quantize_i16(-7.0), -32768);
        assert_eq!(quantize_i16(0.0), 0);
        assert_eq!(quantize_i16(f32::NAN), 0);
        assert_eq!(quantize_i16(0.06), 1966);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let buffer = AudioBuffer::sine(220.0, 0.7, 0.1, 22050).unwrap();
        let first = encode_asset(&buffer).unwrap();
        let second = encode_asset(&buffer).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.content_hash.len(), 64);
    }
}
