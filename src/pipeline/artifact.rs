//! Artifact references and storage
//!
//! A finished run hands back an [`ArtifactRef`]: either the narration's own
//! locator (voice-only paths reuse the fetched audio as-is) or the path of a
//! freshly written mix.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::engine::EncodedAsset;
use crate::error::{ReverieError, Result};

/// Number of hash characters used in artifact file names
const NAME_HASH_LEN: usize = 16;

/// A dereferenceable handle to the final audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRef {
    /// The narration locator, returned unchanged
    Source(String),
    /// A mix written by the pipeline
    File(PathBuf),
}

impl ArtifactRef {
    /// The reference as a locator string a loader or player can open
    pub fn as_locator(&self) -> String {
        match self {
            ArtifactRef::Source(locator) => locator.clone(),
            ArtifactRef::File(path) => format!("file://{}", path.display()),
        }
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactRef::Source(locator) => write!(f, "{}", locator),
            ArtifactRef::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Writes encoded mixes into a directory under content-addressed names
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path an asset is (or would be) stored at
    pub fn path_for(&self, asset: &EncodedAsset) -> PathBuf {
        let prefix_len = asset.content_hash.len().min(NAME_HASH_LEN);
        self.dir
            .join(format!("mix-{}.wav", &asset.content_hash[..prefix_len]))
    }

    /// Write an asset, creating the directory if needed
    ///
    /// Identical bytes always land on the same path, so rewriting is harmless.
    pub fn write(&self, asset: &EncodedAsset) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| ReverieError::FileWriteError {
            path: self.dir.clone(),
            source: e,
        })?;

        let path = self.path_for(asset);
        fs::write(&path, &asset.bytes).map_err(|e| ReverieError::FileWriteError {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), bytes = asset.bytes.len(), "Wrote mix");
        Ok(path)
    }
}
