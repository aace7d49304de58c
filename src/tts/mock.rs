//! Offline synthesizer for testing
//!
//! Returns a fixed locator instead of calling a provider, and records every
//! request so tests can check what would have been sent.

use std::sync::Mutex;

use super::SpeechSynthesizer;
use crate::error::{ReverieError, Result};

/// Synthesizer that always answers with the same narration
#[derive(Debug)]
pub struct StaticSynthesizer {
    locator: String,
    inactive_voices: Vec<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StaticSynthesizer {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            inactive_voices: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reject `voice_id` the way a provider rejects a missing voice
    pub fn with_inactive_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.inactive_voices.push(voice_id.into());
        self
    }

    /// `(script, voice_id)` pairs received so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl SpeechSynthesizer for StaticSynthesizer {
    fn synthesize(&self, script: &str, voice_id: &str) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((script.to_string(), voice_id.to_string()));
        }

        if self.inactive_voices.iter().any(|v| v == voice_id) {
            return Err(ReverieError::VoiceNotActive {
                voice_id: voice_id.to_string(),
            });
        }

        Ok(self.locator.clone())
    }
}
