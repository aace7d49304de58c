//! Pipeline configuration
//!
//! Defaults, overlaid by `REVERIE_*` environment variables, optionally
//! loaded from a JSON file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReverieError, Result};
use crate::mix::MixPolicy;

/// Default per-fetch timeout (20 seconds)
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 20_000;

/// Default directory for encoded mixes
pub const DEFAULT_OUTPUT_DIR: &str = "reverie-out";

/// Settings for one [`Pipeline`](crate::pipeline::Pipeline)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Timeout for each network fetch, in milliseconds
    pub fetch_timeout_ms: u64,
    /// Where mixed files are written
    pub output_dir: PathBuf,
    /// Fetch narration and background in parallel
    pub concurrent_loads: bool,
    /// Gains used when mixing
    pub mix: MixPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            concurrent_loads: true,
            mix: MixPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `REVERIE_FETCH_TIMEOUT_MS`, `REVERIE_OUTPUT_DIR`,
    /// `REVERIE_CONCURRENT_LOADS` and `REVERIE_BACKGROUND_GAIN`
    pub fn from_env() -> Self {
        Self::default().overlay(|key| env::var(key).ok())
    }

    /// Read a JSON config file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ReverieError::InvalidConfig {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply variables from `lookup`; unparsable values are ignored
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(ms) = lookup("REVERIE_FETCH_TIMEOUT_MS").and_then(|s| s.parse().ok()) {
            self.fetch_timeout_ms = ms;
        }
        if let Some(dir) = lookup("REVERIE_OUTPUT_DIR").filter(|s| !s.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(concurrent) = lookup("REVERIE_CONCURRENT_LOADS").and_then(|s| parse_bool(&s)) {
            self.concurrent_loads = concurrent;
        }
        if let Some(gain) = lookup("REVERIE_BACKGROUND_GAIN").and_then(|s| s.parse().ok()) {
            self.mix.background_gain = gain;
        }
        self
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_ms == 0 {
            return Err(ReverieError::InvalidConfig {
                reason: "fetch_timeout_ms must be positive".to_string(),
            });
        }

        for (name, gain) in [
            ("voice_gain", self.mix.voice_gain),
            ("background_gain", self.mix.background_gain),
        ] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(ReverieError::InvalidConfig {
                    reason: format!("{} must be a non-negative number, got {}", name, gain),
                });
            }
        }

        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
