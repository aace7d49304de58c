//! Sample rate conversion
//!
//! Linear interpolation between neighbouring source frames. Upsampling is
//! capped at [`MAX_UPSAMPLE_RATIO`] and output is allocated fallibly, so a
//! track that declares an absurd rate yields an error instead of an abort.

use crate::engine::buffer::AudioBuffer;
use crate::error::{ReverieError, Result};

/// Largest accepted target/source rate ratio (4 kHz up to 192 kHz)
pub const MAX_UPSAMPLE_RATIO: f64 = 48.0;

/// Resample every channel of `buffer` to `target_rate`
///
/// Returns a clone when the rates already match.
pub fn resample(buffer: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer> {
    resample_prefix(buffer, target_rate, usize::MAX)
}

/// Resample, keeping at most `max_frames` output frames
///
/// The kept frames are identical to the start of a full [`resample`]. Use it
/// when only a prefix is needed, e.g. a background longer than the narration.
///
/// # Errors
/// * `InvalidAudio` - `target_rate` is zero, the ratio exceeds
///   [`MAX_UPSAMPLE_RATIO`], or the output cannot be allocated
pub fn resample_prefix(buffer: &AudioBuffer, target_rate: u32, max_frames: usize) -> Result<AudioBuffer> {
    if target_rate == 0 {
        return Err(ReverieError::InvalidAudio {
            reason: "target sample rate must be positive".to_string(),
        });
    }

    let source_rate = buffer.sample_rate();
    let ratio = f64::from(target_rate) / f64::from(source_rate);
    if ratio > MAX_UPSAMPLE_RATIO {
        return Err(ReverieError::InvalidAudio {
            reason: format!(
                "cannot upsample {} Hz to {} Hz (ratio {:.1} exceeds {})",
                source_rate, target_rate, ratio, MAX_UPSAMPLE_RATIO
            ),
        });
    }

    let full_len = (buffer.frame_count() as f64 * ratio).ceil();
    let out_len = if full_len >= max_frames as f64 {
        max_frames
    } else {
        full_len as usize
    }
    .max(1);

    if source_rate == target_rate && out_len >= buffer.frame_count() {
        return Ok(buffer.clone());
    }

    let mut channels = Vec::with_capacity(buffer.channel_count());
    for channel in buffer.channels() {
        channels.push(interpolate(channel, ratio, out_len)?);
    }

    AudioBuffer::new(target_rate, channels)
}

/// `out_len` samples of `samples` read at `ratio` times its rate
fn interpolate(samples: &[f32], ratio: f64, out_len: usize) -> Result<Vec<f32>> {
    let mut out = Vec::new();
    out.try_reserve_exact(out_len).map_err(|e| ReverieError::InvalidAudio {
        reason: format!("cannot allocate {} resampled frames: {}", out_len, e),
    })?;

    let last = samples.len().saturating_sub(1);
    let step = 1.0 / ratio;
    out.extend((0..out_len).map(|i| {
        let pos = i as f64 * step;
        let left = (pos as usize).min(last);
        let right = (left + 1).min(last);
        let t = (pos - left as f64).clamp(0.0, 1.0) as f32;
        samples[left] + (samples[right] - samples[left]) * t
    }));

    Ok(out)
}
