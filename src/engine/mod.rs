//! Audio Engine Module
//!
//! Core audio representation and codecs:
//! - Audio buffer type
//! - Decoding fetched bytes (WAV, MP3, ...)
//! - Canonical 16-bit WAV encoding
//! - Sample rate conversion

pub mod buffer;
pub mod io;
pub mod resample;
pub mod wav;

pub use buffer::{linear_to_db, AudioBuffer};
pub use io::decode_audio;
pub use resample::{resample, resample_prefix, MAX_UPSAMPLE_RATIO};
pub use wav::{encode_asset, encode_wav, quantize_i16, EncodedAsset};
