//! Audio Buffer
//!
//! Normalized in-memory audio shared by the loader, composer and encoder.
//! Samples are stored non-interleaved as 32-bit floats, one `Vec<f32>` per
//! channel. Buffers are immutable once built: mixing produces a new buffer.

use crate::error::{ReverieError, Result};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert linear amplitude to decibels
///
/// Returns `f32::NEG_INFINITY` for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Decoded audio: sample rate, channel count and per-channel float samples
///
/// Invariants enforced at construction:
/// - `sample_rate > 0`
/// - at least one channel, at least one frame
/// - every channel holds exactly `frame_count` samples
///
/// # Example
/// ```
/// use reverie::engine::AudioBuffer;
///
/// let buffer = AudioBuffer::new(44100, vec![vec![0.0; 44100]]).unwrap();
/// assert_eq!(buffer.channel_count(), 1);
/// assert_eq!(buffer.duration_secs(), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Build a buffer from per-channel sample data
    ///
    /// # Errors
    /// * `InvalidAudio` - zero sample rate, no channels, no frames, or
    ///   channels of unequal length
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(ReverieError::InvalidAudio {
                reason: "sample rate must be positive".to_string(),
            });
        }

        let frame_count = match channels.first() {
            Some(first) => first.len(),
            None => {
                return Err(ReverieError::InvalidAudio {
                    reason: "audio has no channels".to_string(),
                })
            }
        };

        if frame_count == 0 {
            return Err(ReverieError::InvalidAudio {
                reason: "audio contains no samples".to_string(),
            });
        }

        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() != frame_count)
        {
            return Err(ReverieError::InvalidAudio {
                reason: format!(
                    "channel {} has {} samples, expected {}",
                    index,
                    channel.len(),
                    frame_count
                ),
            });
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Build a buffer from interleaved data (L, R, L, R, ... for stereo)
    pub fn from_interleaved(interleaved: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(ReverieError::InvalidAudio {
                reason: "audio has no channels".to_string(),
            });
        }

        if interleaved.len() % channel_count != 0 {
            return Err(ReverieError::InvalidAudio {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    channel_count
                ),
            });
        }

        let frames = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];

        for frame in interleaved.chunks_exact(channel_count) {
            for (ch, &sample) in frame.iter().enumerate() {
                channels[ch].push(sample);
            }
        }

        Self::new(sample_rate, channels)
    }

    /// A buffer where every sample of every channel is `value`
    pub fn filled(sample_rate: u32, channel_count: usize, frame_count: usize, value: f32) -> Result<Self> {
        Self::new(sample_rate, vec![vec![value; frame_count]; channel_count])
    }

    /// Mono sine wave, mostly useful for tests and demos
    pub fn sine(frequency: f32, amplitude: f32, duration_secs: f32, sample_rate: u32) -> Result<Self> {
        let frames = (duration_secs * sample_rate as f32) as usize;
        let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
        let samples = (0..frames)
            .map(|i| amplitude * (angular_freq * i as f32).sin())
            .collect();
        Self::new(sample_rate, vec![samples])
    }

    /// Convert the buffer to interleaved (frame-major, channel-minor) order
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut interleaved = Vec::with_capacity(self.channel_count() * self.frame_count());

        for frame in 0..self.frame_count() {
            for channel in &self.channels {
                interleaved.push(channel[frame]);
            }
        }

        interleaved
    }

    /// Samples per second
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of independent channel sequences
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples per channel
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.channels[0].len()
    }

    /// Duration in seconds (`frame_count / sample_rate`)
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Samples of one channel
    ///
    /// # Panics
    /// Panics if `index >= channel_count()`.
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// All channels, in order
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Take ownership of the channel data
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Largest absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|&s| s.abs())
            .fold(0.0_f32, f32::max)
    }

    /// Root mean square level across all channels (linear)
    pub fn rms(&self) -> f32 {
        let total_samples = self.channel_count() * self.frame_count();

        let sum_squares: f64 = self
            .channels
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|&s| (s as f64) * (s as f64))
            .sum();

        (sum_squares / total_samples as f64).sqrt() as f32
    }

    /// Check that every sample is a finite number
    pub fn is_finite(&self) -> bool {
        self.channels
            .iter()
            .all(|channel| channel.iter().all(|s| s.is_finite()))
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
    fn test_new_buffer_properties() {
        let buffer = AudioBuffer::filled(48000, 2, 24000, 0.0).unwrap();
        assert_eq!(buffer.sample_rate(), 48000);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 24000);
        assert_relative_eq!(buffer.duration_secs(), 0.5);
    }

    #[test]
    fn test_rejects_zero_sample_rate() {
        let result = AudioBuffer::new(0, vec![vec![0.0; 10]]);
        assert!(matches!(result, Err(ReverieError::InvalidAudio { .. })));
    }

    #[test]
    fn test_rejects_empty_audio() {
        assert!(AudioBuffer::new(44100, vec![]).is_err());
        assert!(AudioBuffer::new(44100, vec![vec![]]).is_err());
    }

    #[test]
    fn test_rejects_ragged_channels() {
        let result = AudioBuffer::new(44100, vec![vec![0.0; 10], vec![0.0; 9]]);
        match result {
            Err(ReverieError::InvalidAudio { reason }) => assert!(reason.contains("channel 1")),
            other => panic!("Expected InvalidAudio, got: {:?}", other),
        }
    }

    #[test]
    fn test_interleaved_roundtrip() {
        let interleaved = vec![1.0, 5.0, 2.0, 6.0, 3.0, 7.0];
        let buffer = AudioBuffer::from_interleaved(&interleaved, 2, 44100).unwrap();

        assert_eq!(buffer.channel(0), &[1.0, 2.0, 3.0]);
        assert_eq!(buffer.channel(1), &[5.0, 6.0, 7.0]);
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_from_interleaved_rejects_partial_frame() {
        let result = AudioBuffer::from_interleaved(&[0.1, 0.2, 0.3], 2, 44100);
        assert!(result.is_err());
    }

    #[test]
    fn test_peak_and_rms() {
        let buffer = AudioBuffer::new(8000, vec![vec![0.5, -0.5, 0.5, -0.5]]).unwrap();
        assert_relative_eq!(buffer.peak(), 0.5);
        assert_relative_eq!(buffer.rms(), 0.5);
        assert_relative_eq!(linear_to_db(buffer.peak()), -6.0206, epsilon = 1e-3);
    }

    #[test]
    fn test_sine_is_bounded() {
        let buffer = AudioBuffer::sine(440.0, 0.8, 0.25, 44100).unwrap();
        assert_eq!(buffer.frame_count(), 11025);
        assert!(buffer.peak() <= 0.8);
        assert!(buffer.is_finite());
    }

    #[test]
    fn test_linear_to_db_zero() {
        assert_eq!(linear_to_db(0.0), f32::NEG_INFINITY);
    }
}
