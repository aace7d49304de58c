//! Narrated sessions
//!
//! Glues the catalog, a speech synthesizer and the pipeline together:
//! narrate a script with a catalog voice, then lay a catalog soundscape
//! under it.

use tracing::info;

use crate::catalog::{find_soundscape, find_voice};
use crate::error::Result;
use crate::loader::Transport;
use crate::pipeline::{Pipeline, Production};
use crate::tts::SpeechSynthesizer;

/// What to narrate and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub script: String,
    /// Catalog voice id
    pub voice: String,
    /// Catalog soundscape id; `None` for narration only
    pub soundscape: Option<String>,
}

/// Narrate `request.script` and mix it with the requested soundscape
///
/// Unknown catalog ids fail before anything is synthesized. Synthesis errors
/// are fatal; soundscape problems degrade to narration only.
pub fn narrate<T, S>(pipeline: &Pipeline<T>, synthesizer: &S, request: &SessionRequest) -> Result<Production>
where
    T: Transport,
    S: SpeechSynthesizer + ?Sized,
{
    let voice = find_voice(&request.voice)?;
    let soundscape = request.soundscape.as_deref().map(find_soundscape).transpose()?;

    info!(voice = voice.id, soundscape = soundscape.map(|s| s.id), "Starting session");

    let narration = synthesizer.synthesize(&request.script, voice.tts_voice_id)?;
    pipeline.produce(&narration, soundscape.map(|s| s.url))
}
