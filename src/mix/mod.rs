//! Audio Composer
//!
//! Blends the narration with an optional looped ambient background under a
//! fixed gain policy.

mod composer;

pub use composer::{
    compose, mix_tracks, MixPolicy, MixRequest, Track, BACKGROUND_GAIN, VOICE_GAIN,
};
