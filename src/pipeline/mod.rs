//! Pipeline Orchestrator
//!
//! Sequences loader → composer → encoder and applies the fallback policy:
//!
//! 1. The narration must load, otherwise the run fails.
//! 2. A background that fails to load is logged and ignored.
//! 3. Without a background the narration's own locator is returned, along
//!    with the bytes already fetched for it.
//! 4. If mixing or encoding fails, the same narration result is returned.
//!
//! So whenever the narration loads, some playable audio comes back, and
//! [`MixOutcome`] says whether the background made it in.

mod artifact;
mod state;

pub use artifact::{ArtifactRef, ArtifactStore};
pub use state::{PipelineRun, PipelineState};

use std::fmt;
use std::thread;

use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::engine::encode_asset;
use crate::error::{ReverieError, Result};
use crate::loader::{AssetLoader, DefaultTransport, LoadFailure, LoadFailureReason, LoadedAsset, Transport};
use crate::mix::{compose, MixRequest};

/// Label used for the narration in logs and failures
pub const VOICE_LABEL: &str = "voiceover";

/// Label used for the ambient track in logs and failures
pub const BACKGROUND_LABEL: &str = "background";

/// Why a run returned the narration without a background
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The caller supplied no background locator
    NoBackgroundRequested,
    /// The background could not be fetched or decoded
    BackgroundUnavailable(LoadFailure),
    /// Composition failed
    MixFailed(String),
    /// Encoding or writing the mix failed
    EncodeFailed(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NoBackgroundRequested => write!(f, "no background requested"),
            FallbackReason::BackgroundUnavailable(failure) => write!(f, "{}", failure),
            FallbackReason::MixFailed(reason) => write!(f, "mixing failed: {}", reason),
            FallbackReason::EncodeFailed(reason) => write!(f, "encoding failed: {}", reason),
        }
    }
}

/// Whether the background was mixed in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixOutcome {
    /// Narration and background were mixed and written
    Mixed { content_hash: String },
    /// Only the narration is available
    VoiceOnly(FallbackReason),
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct Production {
    pub reference: ArtifactRef,
    pub outcome: MixOutcome,
    /// Bytes behind `reference`: the encoded mix, or the narration exactly
    /// as fetched, so it never has to be fetched again
    pub audio: Vec<u8>,
    /// States visited, starting with `LoadingVoice` and ending with `Done`
    pub trace: Vec<PipelineState>,
}

impl Production {
    pub fn is_mixed(&self) -> bool {
        matches!(self.outcome, MixOutcome::Mixed { .. })
    }
}

/// Produces a single playable file from a narration and an optional background
///
/// Stateless across calls: every `produce` owns its buffers.
#[derive(Debug)]
pub struct Pipeline<T> {
    loader: AssetLoader<T>,
    store: ArtifactStore,
    config: PipelineConfig,
}

impl Pipeline<DefaultTransport> {
    /// Pipeline over the file/HTTP transport described by `config`
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let transport = DefaultTransport::new(config.fetch_timeout())?;
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> Pipeline<T> {
    pub fn new(transport: T, config: PipelineConfig) -> Self {
        Self {
            loader: AssetLoader::new(transport),
            store: ArtifactStore::new(config.output_dir.clone()),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn loader(&self) -> &AssetLoader<T> {
        &self.loader
    }

    /// Run the pipeline
    ///
    /// # Errors
    /// * `VoiceUnavailable` - The narration could not be fetched or decoded.
    ///   This is the only way the run fails once started.
    pub fn produce(&self, voice: &str, background: Option<&str>) -> Result<Production> {
        let mut run = PipelineRun::new();

        let (voice_result, background_result) = self.load_assets(voice, background);

        // The narration's failure wins even when both loads failed
        let LoadedAsset {
            bytes: voice_bytes,
            buffer: voice_buffer,
            ..
        } = match voice_result {
            Ok(asset) => asset,
            Err(failure) => {
                error!(error = %failure, "Voiceover could not be loaded");
                run.advance(PipelineState::Failed)?;
                return Err(ReverieError::VoiceUnavailable { failure });
            }
        };

        let background_asset = match background_result {
            None => {
                info!("Proceeding with voiceover only");
                return self.voice_only(run, voice, voice_bytes, FallbackReason::NoBackgroundRequested);
            }
            Some(result) => {
                run.advance(PipelineState::LoadingBackground)?;
                match result {
                    Ok(asset) => asset,
                    Err(failure) => {
                        warn!(error = %failure, "Background unavailable, proceeding with voiceover only");
                        return self.voice_only(
                            run,
                            voice,
                            voice_bytes,
                            FallbackReason::BackgroundUnavailable(failure),
                        );
                    }
                }
            }
        };

        run.advance(PipelineState::Composing)?;
        let request = MixRequest::new(voice_buffer, Some(background_asset.buffer))
            .with_policy(self.config.mix);
        let mixed = match compose(request) {
            Ok(mixed) => mixed,
            Err(e) => {
                warn!(error = %e, "Mixing failed, falling back to voiceover");
                return self.voice_only(run, voice, voice_bytes, FallbackReason::MixFailed(e.to_string()));
            }
        };

        run.advance(PipelineState::Encoding)?;
        let written = encode_asset(&mixed).and_then(|asset| self.store.write(&asset).map(|path| (path, asset)));
        let (path, asset) = match written {
            Ok(written) => written,
            Err(e) => {
                warn!(error = %e, "Encoding failed, falling back to voiceover");
                return self.voice_only(run, voice, voice_bytes, FallbackReason::EncodeFailed(e.to_string()));
            }
        };

        run.advance(PipelineState::Done)?;
        info!(
            path = %path.display(),
            duration_secs = mixed.duration_secs(),
            "Mix complete"
        );

        Ok(Production {
            reference: ArtifactRef::File(path),
            outcome: MixOutcome::Mixed {
                content_hash: asset.content_hash,
            },
            audio: asset.bytes,
            trace: run.into_trace(),
        })
    }

    fn voice_only(
        &self,
        mut run: PipelineRun,
        voice: &str,
        voice_bytes: Vec<u8>,
        reason: FallbackReason,
    ) -> Result<Production> {
        run.advance(PipelineState::Done)?;
        Ok(Production {
            reference: ArtifactRef::Source(voice.to_string()),
            outcome: MixOutcome::VoiceOnly(reason),
            audio: voice_bytes,
            trace: run.into_trace(),
        })
    }

    /// Load the narration and, when requested, the background
    ///
    /// Sequential mode skips the background once the narration has failed.
    fn load_assets(
        &self,
        voice: &str,
        background: Option<&str>,
    ) -> (
        std::result::Result<LoadedAsset, LoadFailure>,
        Option<std::result::Result<LoadedAsset, LoadFailure>>,
    ) {
        if !self.config.concurrent_loads || background.is_none() {
            let voice_result = self.loader.load(voice, VOICE_LABEL);
            let background_result = match voice_result {
                Ok(_) => background.map(|locator| self.loader.load(locator, BACKGROUND_LABEL)),
                Err(_) => None,
            };
            return (voice_result, background_result);
        }

        thread::scope(|scope| {
            let pending = background.map(|locator| {
                let handle = scope.spawn(move || self.loader.load(locator, BACKGROUND_LABEL));
                (locator, handle)
            });

            let voice_result = self.loader.load(voice, VOICE_LABEL);

            let background_result = pending.map(|(locator, handle)| {
                handle.join().unwrap_or_else(|_| {
                    Err(LoadFailure::new(
                        BACKGROUND_LABEL,
                        locator,
                        LoadFailureReason::Transport("background loader panicked".to_string()),
                    ))
                })
            });

            (voice_result, background_result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{encode_wav, AudioBuffer};
    use crate::loader::MemoryTransport;
    use tempfile::tempdir;

    const VOICE: &str = "https://cdn.test/voice.wav";
    const BED: &str = "https://cdn.test/bed.wav";

    fn config(dir: &std::path::Path, concurrent: bool) -> PipelineConfig {
        PipelineConfig {
            output_dir: dir.to_path_buf(),
            concurrent_loads: concurrent,
            ..PipelineConfig::default()
        }
    }

    fn wav(buffer: &AudioBuffer) -> Vec<u8> {
        encode_wav(buffer).unwrap()
    }

    #[test]
    fn test_sequential_voice_failure_skips_background() {
        let dir = tempdir().unwrap();
        let transport = MemoryTransport::new()
            .with_status(VOICE, 404)
            .with_body(BED, wav(&AudioBuffer::filled(8000, 1, 80, 0.5).unwrap()));
        let pipeline = Pipeline::new(transport, config(dir.path(), false));

        let err = pipeline.produce(VOICE, Some(BED)).unwrap_err();
        assert!(matches!(err, ReverieError::VoiceUnavailable { .. }));
        assert_eq!(pipeline.loader().transport().requests(), vec![VOICE.to_string()]);
    }

    #[test]
    fn test_trace_of_no_background_run() {
        let dir = tempdir().unwrap();
        let transport =
            MemoryTransport::new().with_body(VOICE, wav(&AudioBuffer::filled(8000, 1, 80, 0.1).unwrap()));
        let pipeline = Pipeline::new(transport, config(dir.path(), true));

        let production = pipeline.produce(VOICE, None).unwrap();
        assert_eq!(production.trace, vec![PipelineState::LoadingVoice, PipelineState::Done]);
        assert_eq!(production.outcome, MixOutcome::VoiceOnly(FallbackReason::NoBackgroundRequested));
        assert_eq!(production.reference, ArtifactRef::Source(VOICE.to_string()));
        assert_eq!(production.audio, wav(&AudioBuffer::filled(8000, 1, 80, 0.1).unwrap()));
    }

    #[test]
    fn test_encode_failure_falls_back_to_voice() {
        let dir = tempdir().unwrap();
        // A file where the output directory should be makes the write fail
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let transport = MemoryTransport::new()
            .with_body(VOICE, wav(&AudioBuffer::filled(8000, 1, 80, 0.1).unwrap()))
            .with_body(BED, wav(&AudioBuffer::filled(8000, 1, 40, 0.5).unwrap()));
        let pipeline = Pipeline::new(transport, config(&blocker, true));

        let production = pipeline.produce(VOICE, Some(BED)).unwrap();
        assert!(matches!(
            production.outcome,
            MixOutcome::VoiceOnly(FallbackReason::EncodeFailed(_))
        ));
        assert_eq!(production.reference, ArtifactRef::Source(VOICE.to_string()));
        assert_eq!(
            production.trace,
            vec![
                PipelineState::LoadingVoice,
                PipelineState::LoadingBackground,
                PipelineState::Composing,
                PipelineState::Encoding,
                PipelineState::Done,
            ]
        );
    }

    #[test]
    fn test_mix_failure_falls_back_to_voice() {
        let dir = tempdir().unwrap();
        let transport = MemoryTransport::new()
            .with_body(VOICE, wav(&AudioBuffer::filled(8000, 1, 80, 0.1).unwrap()))
            .with_body(BED, wav(&AudioBuffer::filled(8000, 1, 40, 0.5).unwrap()));
        let mut cfg = config(dir.path(), true);
        cfg.mix.background_gain = f32::NAN;
        let pipeline = Pipeline::new(transport, cfg);

        let production = pipeline.produce(VOICE, Some(BED)).unwrap();
        assert!(matches!(
            production.outcome,
            MixOutcome::VoiceOnly(FallbackReason::MixFailed(_))
        ));
        assert_eq!(production.trace.last(), Some(&PipelineState::Done));
        assert!(!production.trace.contains(&PipelineState::Encoding));
    }
}
