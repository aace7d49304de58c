//! Audio decoding for Reverie
//!
//! Turns fetched bytes into an [`AudioBuffer`]. WAV payloads go through
//! `hound`; everything else (MP3 from the speech service and most ambient
//! tracks) is probed with Symphonia. A WAV that hound rejects, such as an
//! unusual extensible layout, gets a second chance through Symphonia.

use std::io::Cursor;

use hound::{SampleFormat, WavReader};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::engine::buffer::AudioBuffer;
use crate::error::{ReverieError, Result};

/// Decode an in-memory audio file
///
/// # Arguments
/// * `bytes` - Complete file contents
/// * `extension` - Optional extension hint ("mp3", "wav", ...) for the prober
///
/// # Errors
/// * `InvalidAudio` - The bytes could not be decoded or held no frames
/// * `UnsupportedFormat` - No decoder recognised the container or codec
pub fn decode_audio(bytes: &[u8], extension: Option<&str>) -> Result<AudioBuffer> {
    if is_riff_wave(bytes) {
        match decode_wav(bytes) {
            Ok(buffer) => return Ok(buffer),
            Err(e) => {
                debug!(error = %e, "hound rejected WAV payload, probing with symphonia");
            }
        }
    }

    decode_with_symphonia(bytes, extension)
}

/// Check for the RIFF/WAVE magic at the start of a payload
pub fn is_riff_wave(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Decode a WAV file with hound
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| ReverieError::InvalidAudio {
        reason: format!("Failed to open WAV data: {}", e),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;

    AudioBuffer::from_interleaved(&samples, channels, spec.sample_rate)
}

/// Read samples from a WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let invalid = |bits: &str, e: hound::Error| ReverieError::InvalidAudio {
        reason: format!("Failed to read {} samples: {}", bits, e),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| invalid("float", e)),
        SampleFormat::Int => match bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("8-bit", e)),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("16-bit", e)),
            // 24-bit is stored as i32 in hound
            24 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8388608.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("24-bit", e)),
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2147483648.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("32-bit int", e)),
            _ => Err(ReverieError::UnsupportedFormat {
                format: format!("{}-bit integer audio", bits_per_sample),
            }),
        },
    }
}

/// Probe and fully decode a payload with Symphonia
fn decode_with_symphonia(bytes: &[u8], extension: Option<&str>) -> Result<AudioBuffer> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| ReverieError::UnsupportedFormat {
            format: format!("unrecognised container: {}", e),
        })?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ReverieError::InvalidAudio {
            reason: "no audio track found".to_string(),
        })?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| ReverieError::UnsupportedFormat {
            format: format!("codec init failed: {}", e),
        })?;

    let mut interleaved = Vec::new();
    let mut sample_rate = codec_params.sample_rate;
    let mut channel_count = codec_params.channels.map(|c| c.count());

    loop {
        let packet = match reader.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(ReverieError::InvalidAudio {
                    reason: format!("failed to read packet: {}", e),
                })
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!(error = %msg, "Skipping corrupted audio packet");
                continue;
            }
            Err(e) => {
                return Err(ReverieError::InvalidAudio {
                    reason: format!("decode failed: {}", e),
                })
            }
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        if frames == 0 {
            continue;
        }

        sample_rate = Some(spec.rate);
        channel_count = Some(spec.channels.count());

        let mut sample_buf = SampleBuffer::<f32>::new(frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    let (sample_rate, channel_count) = match (sample_rate, channel_count) {
        (Some(rate), Some(count)) => (rate, count),
        _ => {
            return Err(ReverieError::InvalidAudio {
                reason: "stream did not report a sample rate or channel layout".to_string(),
            })
        }
    };

    debug!(
        sample_rate,
        channels = channel_count,
        samples = interleaved.len(),
        "Decoded compressed audio"
    );

    AudioBuffer::from_interleaved(&interleaved, channel_count, sample_rate)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn wav_bytes(spec: WavSpec, write: impl FnOnce(&mut WavWriter<Cursor<&mut Vec<u8>>>)) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            write(&mut writer);
            writer.finalize().unwrap();
        }
        bytes
    }

    #[test]
    fn test_decode_16bit_stereo_wav() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, |w| {
            for _ in 0..100 {
                w.write_sample(16384i16).unwrap();
                w.write_sample(-16384i16).unwrap();
            }
        });

        let buffer = decode_audio(&bytes, Some("wav")).unwrap();
        assert_eq!(buffer.sample_rate(), 22050);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 100);
        assert_eq!(buffer.channel(0)[0], 0.5);
        assert_eq!(buffer.channel(1)[99], -0.5);
    }

    #[test]
    fn test_decode_float_wav() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let bytes = wav_bytes(spec, |w| {
            for i in 0..480 {
                w.write_sample(i as f32 / 480.0).unwrap();
            }
        });

        let buffer = decode_audio(&bytes, None).unwrap();
        assert_eq!(buffer.frame_count(), 480);
        assert_eq!(buffer.channel(0)[240], 0.5);
    }

    #[test]
    fn test_decode_empty_wav_fails() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, |_| {});

        assert!(decode_audio(&bytes, Some("wav")).is_err());
    }

    /// Silent MPEG-1 Layer III stream: 128 kbps, 44.1 kHz, mono
    fn silent_mp3(frames: usize) -> Vec<u8> {
        // 144 * 128000 / 44100 bytes per unpadded frame
        const FRAME_LEN: usize = 417;
        let mut bytes = Vec::with_capacity(frames * FRAME_LEN);
        for _ in 0..frames {
            let start = bytes.len();
            bytes.extend_from_slice(&[0xFF, 0xFB, 0x90, 0xC0]);
            bytes.resize(start + FRAME_LEN, 0);
        }
        bytes
    }

    #[test]
    fn test_decode_mp3_frames() {
        let buffer = decode_audio(&silent_mp3(20), Some("mp3")).unwrap();

        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.channel_count(), 1);
        // 1152 samples per frame, less any decoder delay trimming
        assert!(buffer.frame_count() > 0);
        assert!(buffer.frame_count() <= 20 * 1152);
        assert!(buffer.peak() < 1e-6);
    }

    #[test]
    fn test_decode_mp3_without_extension_hint() {
        let buffer = decode_audio(&silent_mp3(20), None).unwrap();
        assert_eq!(buffer.sample_rate(), 44100);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let garbage = b"this is certainly not an audio file".to_vec();
        assert!(decode_audio(&garbage, Some("mp3")).is_err());
    }

    #[test]
    fn test_riff_magic_detection() {
        assert!(is_riff_wave(b"RIFF\0\0\0\0WAVEfmt "));
        assert!(!is_riff_wave(b"ID3\x04\0\0\0\0\0\0\0\0"));
        assert!(!is_riff_wave(b"RIFF"));
    }
}
