//! Speech Synthesis
//!
//! Turns a meditation script into narration audio. A synthesizer hands back
//! a locator the [`AssetLoader`](crate::loader::AssetLoader) can open, so its
//! output feeds the pipeline like any other narration.

mod elevenlabs;
mod mock;

pub use elevenlabs::{ElevenLabsConfig, ElevenLabsSynthesizer, VoiceSettings};
pub use mock::StaticSynthesizer;

use crate::error::Result;

/// Produces narration audio from text
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `script` with the provider voice `voice_id`
    ///
    /// Returns a locator for the generated audio.
    fn synthesize(&self, script: &str, voice_id: &str) -> Result<String>;
}

impl<S: SpeechSynthesizer + ?Sized> SpeechSynthesizer for &S {
    fn synthesize(&self, script: &str, voice_id: &str) -> Result<String> {
        (**self).synthesize(script, voice_id)
    }
}

impl<S: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Box<S> {
    fn synthesize(&self, script: &str, voice_id: &str) -> Result<String> {
        (**self).synthesize(script, voice_id)
    }
}
