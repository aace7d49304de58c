//! Asset Loader
//!
//! Fetches an audio resource and decodes it into an [`AudioBuffer`].
//! Failures come back as a [`LoadFailure`] value rather than aborting, since
//! some assets (the ambient background) are optional; the caller decides
//! whether a failure is fatal.

mod memory;
mod transport;

pub use memory::MemoryTransport;
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{DefaultTransport, FileTransport, Locator, Transport};

use thiserror::Error;
use tracing::{debug, info};

use crate::engine::{decode_audio, AudioBuffer};

/// Why an asset could not be loaded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadFailureReason {
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("Empty audio data received")]
    EmptyPayload,

    #[error("could not decode audio: {0}")]
    Decode(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// A failed load: which asset, from where, and why
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not load {label} from {locator}: {reason}")]
pub struct LoadFailure {
    /// Human label of the asset ("voiceover", "background")
    pub label: String,
    /// The locator as supplied by the caller
    pub locator: String,
    pub reason: LoadFailureReason,
}

impl LoadFailure {
    pub fn new(label: &str, locator: &str, reason: LoadFailureReason) -> Self {
        Self {
            label: label.to_string(),
            locator: locator.to_string(),
            reason,
        }
    }
}

/// A successfully fetched and decoded asset
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    pub locator: Locator,
    /// The payload exactly as fetched
    pub bytes: Vec<u8>,
    pub buffer: AudioBuffer,
}

/// Loads audio assets over a [`Transport`]
#[derive(Debug, Clone)]
pub struct AssetLoader<T> {
    transport: T,
}

impl<T: Transport> AssetLoader<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch and decode one asset
    ///
    /// A non-success status, an empty payload or undecodable bytes all
    /// produce a [`LoadFailure`] labelled with `label`. Single attempt, no
    /// retries.
    pub fn load(&self, locator: &str, label: &str) -> std::result::Result<LoadedAsset, LoadFailure> {
        let fail = |reason: LoadFailureReason| LoadFailure::new(label, locator, reason);

        let parsed = Locator::parse(locator).map_err(|e| fail(LoadFailureReason::InvalidLocator(e.to_string())))?;

        info!(label, locator, "Processing audio asset");

        let bytes = self.transport.fetch(&parsed).map_err(fail)?;
        if bytes.is_empty() {
            return Err(fail(LoadFailureReason::EmptyPayload));
        }

        let extension = parsed.extension();
        let buffer = decode_audio(&bytes, extension.as_deref())
            .map_err(|e| fail(LoadFailureReason::Decode(e.to_string())))?;

        debug!(
            label,
            sample_rate = buffer.sample_rate(),
            channels = buffer.channel_count(),
            frames = buffer.frame_count(),
            "Decoded audio asset"
        );

        Ok(LoadedAsset {
            locator: parsed,
            bytes,
            buffer,
        })
    }
}
