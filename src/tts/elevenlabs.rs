//! ElevenLabs text-to-speech client
//!
//! Requests narration tuned for meditation (high stability, no style
//! exaggeration) and stores the returned MP3 next to the mixes.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
#[cfg(feature = "http")]
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use super::SpeechSynthesizer;
use crate::error::{ReverieError, Result};

/// Public ElevenLabs endpoint
pub const DEFAULT_API_URL: &str = "https://api.elevenlabs.io";

/// Multilingual model used for all narration
pub const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";

/// Synthesis can take a while for long scripts
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Provider-side voice tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    /// A flat, steady delivery
    fn default() -> Self {
        Self {
            stability: 0.92,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

/// Connection settings for the ElevenLabs API
#[derive(Clone, PartialEq)]
pub struct ElevenLabsConfig {
    pub api_url: String,
    pub api_key: String,
    pub model_id: String,
    pub timeout_ms: u64,
    pub voice_settings: VoiceSettings,
}

impl fmt::Debug for ElevenLabsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model_id", &self.model_id)
            .field("timeout_ms", &self.timeout_ms)
            .field("voice_settings", &self.voice_settings)
            .finish()
    }
}

impl ElevenLabsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            voice_settings: VoiceSettings::default(),
        }
    }

    /// Read `ELEVENLABS_API_KEY` (required), `ELEVENLABS_API_URL`,
    /// `ELEVENLABS_MODEL_ID` and `ELEVENLABS_TIMEOUT_MS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("ELEVENLABS_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ReverieError::InvalidConfig {
                reason: "ELEVENLABS_API_KEY is not set".to_string(),
            })?;

        let mut config = Self::new(api_key);
        if let Some(url) = lookup("ELEVENLABS_API_URL").filter(|s| !s.is_empty()) {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("ELEVENLABS_MODEL_ID").filter(|s| !s.is_empty()) {
            config.model_id = model;
        }
        config.timeout_ms = lookup("ELEVENLABS_TIMEOUT_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        Ok(config)
    }

    /// Endpoint for one voice
    pub fn speech_url(&self, voice_id: &str) -> String {
        format!("{}/v1/text-to-speech/{}", self.api_url, voice_id)
    }
}

/// Body of a text-to-speech request
#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// Error body the API sends on failure
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Map a failed response to an error
fn failure_for_status(status: u16, voice_id: &str, body: &[u8]) -> ReverieError {
    if status == 404 {
        return ReverieError::VoiceNotActive {
            voice_id: voice_id.to_string(),
        };
    }

    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .and_then(|d| d.message)
        .unwrap_or_else(|| format!("ElevenLabs Error: {}", status));

    ReverieError::SpeechSynthesisFailed { reason: message }
}

/// Write narration bytes under a content-addressed name and return its locator
fn store_narration(dir: &Path, audio: &[u8]) -> Result<String> {
    if audio.is_empty() {
        return Err(ReverieError::SpeechSynthesisFailed {
            reason: "provider returned no audio".to_string(),
        });
    }

    fs::create_dir_all(dir).map_err(|e| ReverieError::FileWriteError {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let hash = format!("{:x}", Sha256::digest(audio));
    let path = dir.join(format!("voice-{}.mp3", &hash[..16]));
    fs::write(&path, audio).map_err(|e| ReverieError::FileWriteError {
        path: path.clone(),
        source: e,
    })?;

    info!(path = %path.display(), bytes = audio.len(), "Stored narration");
    Ok(format!("file://{}", path.display()))
}

/// Synthesizer backed by the ElevenLabs API
#[derive(Debug)]
pub struct ElevenLabsSynthesizer {
    config: ElevenLabsConfig,
    output_dir: PathBuf,
    #[cfg(feature = "http")]
    client: reqwest::blocking::Client,
}

impl ElevenLabsSynthesizer {
    /// Narration files are written into `output_dir`
    pub fn new(config: ElevenLabsConfig, output_dir: impl Into<PathBuf>) -> Result<Self> {
        #[cfg(feature = "http")]
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ReverieError::InvalidConfig {
                reason: format!("cannot build HTTP client: {}", e),
            })?;

        Ok(Self {
            config,
            output_dir: output_dir.into(),
            #[cfg(feature = "http")]
            client,
        })
    }

    pub fn config(&self) -> &ElevenLabsConfig {
        &self.config
    }

    #[cfg(feature = "http")]
    fn request_audio(&self, script: &str, voice_id: &str) -> Result<Vec<u8>> {
        let body = SpeechRequest {
            text: script,
            model_id: &self.config.model_id,
            voice_settings: self.config.voice_settings,
        };

        let response = self
            .client
            .post(self.config.speech_url(voice_id))
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("timed out after {} ms", self.config.timeout_ms)
                } else {
                    e.to_string()
                };
                ReverieError::SpeechSynthesisFailed { reason }
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .map_err(|e| ReverieError::SpeechSynthesisFailed {
                reason: e.to_string(),
            })?;

        if !status.is_success() {
            return Err(failure_for_status(status.as_u16(), voice_id, &bytes));
        }

        Ok(bytes.to_vec())
    }

    #[cfg(not(feature = "http"))]
    fn request_audio(&self, _script: &str, _voice_id: &str) -> Result<Vec<u8>> {
        Err(ReverieError::SpeechSynthesisFailed {
            reason: "HTTP support not compiled. Build with --features http".to_string(),
        })
    }
}

impl SpeechSynthesizer for ElevenLabsSynthesizer {
    fn synthesize(&self, script: &str, voice_id: &str) -> Result<String> {
        if script.trim().is_empty() {
            return Err(ReverieError::SpeechSynthesisFailed {
                reason: "script is empty".to_string(),
            });
        }

        info!(voice_id, chars = script.len(), "Requesting narration");
        let audio = self.request_audio(script, voice_id)?;
        store_narration(&self.output_dir, &audio)
    }
}
