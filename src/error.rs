//! Error handling for Reverie
//!
//! Errors are split into fatal ones (the voiceover or the speech service is
//! unusable) and recoverable ones that the pipeline absorbs by falling back
//! to the unmixed narration.

use std::path::PathBuf;

use thiserror::Error;

use crate::loader::LoadFailure;

/// Result type alias for Reverie operations
pub type Result<T> = std::result::Result<T, ReverieError>;

/// Message shown to the user when the mandatory narration cannot be used.
pub const VOICE_FAILURE_MESSAGE: &str = "Critical error: Failed to process the voiceover audio.";

/// Main error type for Reverie operations
#[derive(Error, Debug)]
pub enum ReverieError {
    // Asset Errors
    #[error("Critical error: Failed to process the voiceover audio.")]
    VoiceUnavailable {
        #[source]
        failure: LoadFailure,
    },

    #[error(transparent)]
    Load(#[from] LoadFailure),

    #[error("Invalid locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    // Audio Errors
    #[error("Invalid audio: {reason}")]
    InvalidAudio { reason: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // Pipeline Errors
    #[error("Mixing failed: {reason}")]
    MixFailed { reason: String },

    #[error("Encoding failed: {reason}")]
    EncodeFailed { reason: String },

    #[error("Invalid pipeline transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Unknown {kind}: {id}")]
    UnknownCatalogEntry { kind: &'static str, id: String },

    // Speech Service Errors
    #[error("Voice ID not active: {voice_id}")]
    VoiceNotActive { voice_id: String },

    #[error("Speech synthesis failed: {reason}")]
    SpeechSynthesisFailed { reason: String },

    // I/O Errors
    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReverieError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ReverieError::VoiceUnavailable { .. } => "VOICE_UNAVAILABLE",
            ReverieError::Load(_) => "LOAD_FAILED",
            ReverieError::InvalidLocator { .. } => "INVALID_LOCATOR",
            ReverieError::InvalidAudio { .. } => "INVALID_AUDIO",
            ReverieError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            ReverieError::MixFailed { .. } => "MIX_FAILED",
            ReverieError::EncodeFailed { .. } => "ENCODE_FAILED",
            ReverieError::InvalidTransition { .. } => "INVALID_TRANSITION",
            ReverieError::InvalidConfig { .. } => "INVALID_CONFIG",
            ReverieError::UnknownCatalogEntry { .. } => "UNKNOWN_CATALOG_ENTRY",
            ReverieError::VoiceNotActive { .. } => "VOICE_NOT_ACTIVE",
            ReverieError::SpeechSynthesisFailed { .. } => "SPEECH_SYNTHESIS_FAILED",
            ReverieError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            ReverieError::Io(_) => "IO_ERROR",
            ReverieError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the pipeline can absorb this error by degrading to voice-only
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReverieError::Load(_)
                | ReverieError::MixFailed { .. }
                | ReverieError::EncodeFailed { .. }
                | ReverieError::FileWriteError { .. }
        )
    }

    /// Get a user-friendly message for this error
    pub fn friendly_message(&self) -> String {
        match self {
            ReverieError::VoiceUnavailable { .. } => VOICE_FAILURE_MESSAGE.to_string(),
            ReverieError::VoiceNotActive { .. } => {
                "Voice ID not active. Please ensure the voice is available in your speech provider account."
                    .to_string()
            }
            ReverieError::SpeechSynthesisFailed { reason } => {
                format!("The narration could not be generated: {}", reason)
            }
            ReverieError::UnknownCatalogEntry { kind, id } => {
                format!("There is no {} called '{}'. Run 'reverie-cli catalog' to see the options.", kind, id)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadFailureReason;

    #[test]
    fn test_voice_failure_message_is_exact() {
        let err = ReverieError::VoiceUnavailable {
            failure: LoadFailure::new("voiceover", "file:///missing.mp3", LoadFailureReason::Status(404)),
        };
        assert_eq!(err.to_string(), VOICE_FAILURE_MESSAGE);
        assert_eq!(err.friendly_message(), VOICE_FAILURE_MESSAGE);
        assert_eq!(err.error_code(), "VOICE_UNAVAILABLE");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_voice_failure_keeps_source() {
        use std::error::Error;

        let err = ReverieError::VoiceUnavailable {
            failure: LoadFailure::new("voiceover", "a.wav", LoadFailureReason::EmptyPayload),
        };
        let source = err.source().expect("load failure should be the source");
        assert!(source.to_string().contains("voiceover"));
    }

    #[test]
    fn test_degraded_errors_are_recoverable() {
        let err = ReverieError::MixFailed {
            reason: "allocation".to_string(),
        };
        assert!(err.is_recoverable());
        assert!(ReverieError::EncodeFailed { reason: "too long".to_string() }.is_recoverable());
        assert!(!ReverieError::VoiceNotActive { voice_id: "x".to_string() }.is_recoverable());
    }
}
