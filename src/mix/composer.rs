//! Narration / background composer
//!
//! Lays a looped, attenuated ambient track under the narration. The output
//! always takes the narration's sample rate, channel count and length: a
//! longer background is truncated, a shorter one wraps around to its start.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{resample_prefix, AudioBuffer};
use crate::error::{ReverieError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Narration gain (unity)
pub const VOICE_GAIN: f32 = 1.0;

/// Background gain, low enough that the narration stays intelligible
pub const BACKGROUND_GAIN: f32 = 0.12;

// ============================================================================
// Mix Policy
// ============================================================================

/// Linear gains applied to each signal before summation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixPolicy {
    pub voice_gain: f32,
    pub background_gain: f32,
}

impl Default for MixPolicy {
    fn default() -> Self {
        Self {
            voice_gain: VOICE_GAIN,
            background_gain: BACKGROUND_GAIN,
        }
    }
}

/// A narration, an optional background and the gains to mix them with
#[derive(Debug, Clone)]
pub struct MixRequest {
    pub voice: AudioBuffer,
    pub background: Option<AudioBuffer>,
    pub policy: MixPolicy,
}

impl MixRequest {
    /// Pair buffers under the default policy
    pub fn new(voice: AudioBuffer, background: Option<AudioBuffer>) -> Self {
        Self {
            voice,
            background,
            policy: MixPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MixPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// One input to [`mix_tracks`]
#[derive(Debug, Clone, Copy)]
pub struct Track<'a> {
    pub buffer: &'a AudioBuffer,
    pub gain: f32,
    /// Wrap around to the start when shorter than the output
    pub looped: bool,
}

// ============================================================================
// Composition
// ============================================================================

/// Compose the narration with an optional background
///
/// Without a background the narration is returned untouched. Otherwise the
/// background is resampled to the narration's rate (only as much as the
/// narration covers), its channels are mapped
/// with `c % background_channels`, and each output sample is
/// `clamp(voice * voice_gain + background[i % bg_frames] * background_gain, -1, 1)`.
///
/// # Errors
/// * `MixFailed` - Resampling or output allocation failed, or the sum was
///   not finite
pub fn compose(request: MixRequest) -> Result<AudioBuffer> {
    let MixRequest {
        voice,
        background,
        policy,
    } = request;

    let background = match background {
        Some(bg) => bg,
        None => return Ok(voice),
    };

    let background = if background.sample_rate() != voice.sample_rate() {
        debug!(
            from = background.sample_rate(),
            to = voice.sample_rate(),
            "Resampling background to narration rate"
        );
        // Frames past the narration's end would be discarded anyway
        resample_prefix(&background, voice.sample_rate(), voice.frame_count()).map_err(|e| ReverieError::MixFailed {
            reason: format!("background resampling failed: {}", e),
        })?
    } else {
        background
    };

    mix_tracks(&[
        Track {
            buffer: &voice,
            gain: policy.voice_gain,
            looped: false,
        },
        Track {
            buffer: &background,
            gain: policy.background_gain,
            looped: true,
        },
    ])
}

/// Sum any number of tracks onto the first track's timeline
///
/// The first track fixes the output rate, channel count and length. Every
/// track must already share that sample rate. Non-looped tracks shorter
/// than the output contribute silence past their end.
pub fn mix_tracks(tracks: &[Track<'_>]) -> Result<AudioBuffer> {
    let lead = tracks.first().ok_or_else(|| ReverieError::MixFailed {
        reason: "no tracks to mix".to_string(),
    })?;

    let sample_rate = lead.buffer.sample_rate();
    let channel_count = lead.buffer.channel_count();
    let frames = lead.buffer.frame_count();

    if let Some((index, track)) = tracks
        .iter()
        .enumerate()
        .find(|(_, t)| t.buffer.sample_rate() != sample_rate)
    {
        return Err(ReverieError::MixFailed {
            reason: format!(
                "track {} is at {} Hz, expected {} Hz",
                index,
                track.buffer.sample_rate(),
                sample_rate
            ),
        });
    }

    let mut output = Vec::new();
    output
        .try_reserve_exact(channel_count)
        .map_err(|e| allocation_failed(&e))?;
    for _ in 0..channel_count {
        let mut channel = Vec::new();
        channel.try_reserve_exact(frames).map_err(|e| allocation_failed(&e))?;
        channel.resize(frames, 0.0_f32);
        output.push(channel);
    }

    for track in tracks {
        for (c, out) in output.iter_mut().enumerate() {
            let source = track.buffer.channel(c % track.buffer.channel_count());
            let source_len = source.len();

            if track.looped {
                for (i, sample) in out.iter_mut().enumerate() {
                    *sample += source[i % source_len] * track.gain;
                }
            } else {
                for (sample, &s) in out.iter_mut().zip(source.iter()) {
                    *sample += s * track.gain;
                }
            }
        }
    }

    for sample in output.iter_mut().flat_map(|channel| channel.iter_mut()) {
        *sample = sample.clamp(-1.0, 1.0);
    }

    let mixed = AudioBuffer::new(sample_rate, output)?;
    if !mixed.is_finite() {
        return Err(ReverieError::MixFailed {
            reason: "mix produced invalid audio (NaN/Inf)".to_string(),
        });
    }

    Ok(mixed)
}

fn allocation_failed(e: &std::collections::TryReserveError) -> ReverieError {
    ReverieError::MixFailed {
        reason: format!("cannot allocate mix output: {}", e),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_no_background_is_identity() {
        let voice = AudioBuffer::sine(300.0, 1.2, 0.1, 8000).unwrap();
        let composed = compose(MixRequest::new(voice.clone(), None)).unwrap();

        // Passed through untouched, even the out-of-range samples
        assert_eq!(composed, voice);
    }

    #[test]
    fn test_background_is_truncated_to_voice_length() {
        let voice = AudioBuffer::filled(8000, 1, 100, 0.0).unwrap();
        let background = AudioBuffer::filled(8000, 1, 1000, 0.5).unwrap();

        let mixed = compose(MixRequest::new(voice, Some(background))).unwrap();
        assert_eq!(mixed.frame_count(), 100);
        assert_relative_eq!(mixed.channel(0)[99], 0.06, epsilon = 1e-6);
    }

    #[test]
    fn test_background_loops_when_shorter() {
        let voice = AudioBuffer::filled(1000, 1, 10, 0.0).unwrap();
        let background = AudioBuffer::new(1000, vec![vec![0.1, 0.2, 0.3, 0.4]]).unwrap();

        let mixed = compose(MixRequest::new(voice, Some(background.clone()))).unwrap();
        for i in 0..10 {
            assert_relative_eq!(
                mixed.channel(0)[i],
                background.channel(0)[i % 4] * BACKGROUND_GAIN,
                epsilon = 1e-7
            );
        }
    }

    #[test]
    fn test_mono_background_fills_every_voice_channel() {
        let voice = AudioBuffer::filled(1000, 2, 8, 0.0).unwrap();
        let background = AudioBuffer::filled(1000, 1, 8, 1.0).unwrap();

        let mixed = compose(MixRequest::new(voice, Some(background))).unwrap();
        assert_eq!(mixed.channel_count(), 2);
        assert!(mixed.channel(1).iter().all(|&s| (s - BACKGROUND_GAIN).abs() < 1e-7));
    }

    #[test]
    fn test_stereo_background_under_mono_voice_uses_first_channel() {
        let voice = AudioBuffer::filled(1000, 1, 4, 0.0).unwrap();
        let background = AudioBuffer::new(1000, vec![vec![0.5; 4], vec![-0.5; 4]]).unwrap();

        let mixed = compose(MixRequest::new(voice, Some(background))).unwrap();
        assert_eq!(mixed.channel_count(), 1);
        assert_relative_eq!(mixed.channel(0)[0], 0.06, epsilon = 1e-6);
    }

    #[test]
    fn test_sum_is_clamped() {
        let voice = AudioBuffer::filled(1000, 1, 4, 1.0).unwrap();
        let background = AudioBuffer::filled(1000, 1, 4, 1.0).unwrap();
        let policy = MixPolicy {
            voice_gain: 1.0,
            background_gain: 1.0,
        };

        let mixed = compose(MixRequest::new(voice, Some(background)).with_policy(policy)).unwrap();
        assert!(mixed.channel(0).iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_background_is_resampled_to_voice_rate() {
        let voice = AudioBuffer::filled(44100, 1, 44100, 0.0).unwrap();
        let background = AudioBuffer::filled(22050, 1, 11025, 0.5).unwrap();

        let mixed = compose(MixRequest::new(voice, Some(background))).unwrap();
        assert_eq!(mixed.sample_rate(), 44100);
        assert_eq!(mixed.frame_count(), 44100);
        assert!(mixed.channel(0).iter().all(|&s| (s - 0.06).abs() < 1e-6));
    }

    #[test]
    fn test_long_background_resamples_only_what_is_heard() {
        let voice = AudioBuffer::filled(48000, 1, 480, 0.0).unwrap();
        let background = AudioBuffer::sine(100.0, 0.5, 10.0, 8000).unwrap();

        let mixed = compose(MixRequest::new(voice, Some(background.clone()))).unwrap();
        let full = crate::engine::resample(&background, 48000).unwrap();
        assert_eq!(mixed.frame_count(), 480);
        for i in [0, 1, 239, 479] {
            assert_relative_eq!(mixed.channel(0)[i], full.channel(0)[i] * BACKGROUND_GAIN, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_unresamplable_background_fails_the_mix() {
        let voice = AudioBuffer::filled(192_000, 1, 1920, 0.0).unwrap();
        let background = AudioBuffer::filled(1, 1, 2_000_000, 0.5).unwrap();

        let result = compose(MixRequest::new(voice, Some(background)));
        assert!(matches!(result, Err(ReverieError::MixFailed { .. })));
    }

    #[test]
    fn test_mix_tracks_rejects_rate_mismatch() {
        let a = AudioBuffer::filled(44100, 1, 10, 0.0).unwrap();
        let b = AudioBuffer::filled(48000, 1, 10, 0.0).unwrap();
        let result = mix_tracks(&[
            Track { buffer: &a, gain: 1.0, looped: false },
            Track { buffer: &b, gain: 1.0, looped: true },
        ]);
        assert!(matches!(result, Err(ReverieError::MixFailed { .. })));
    }

    #[test]
    fn test_mix_tracks_three_layers() {
        let lead = AudioBuffer::filled(1000, 1, 6, 0.1).unwrap();
        let short = AudioBuffer::filled(1000, 1, 3, 0.2).unwrap();
        let bed = AudioBuffer::filled(1000, 1, 2, 0.3).unwrap();

        let mixed = mix_tracks(&[
            Track { buffer: &lead, gain: 1.0, looped: false },
            Track { buffer: &short, gain: 1.0, looped: false },
            Track { buffer: &bed, gain: 0.5, looped: true },
        ])
        .unwrap();

        assert_relative_eq!(mixed.channel(0)[0], 0.45, epsilon = 1e-6);
        // The unlooped track has ended by frame 3
        assert_relative_eq!(mixed.channel(0)[5], 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_mix_tracks_needs_input() {
        assert!(mix_tracks(&[]).is_err());
    }

    #[test]
    fn test_non_finite_gain_fails() {
        let voice = AudioBuffer::filled(1000, 1, 4, 0.0).unwrap();
        let background = AudioBuffer::filled(1000, 1, 4, 0.5).unwrap();
        let policy = MixPolicy {
            voice_gain: 1.0,
            background_gain: f32::NAN,
        };

        let result = compose(MixRequest::new(voice, Some(background)).with_policy(policy));
        assert!(matches!(result, Err(ReverieError::MixFailed { .. })));
    }
}
