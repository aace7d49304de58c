//! Reverie - Narrated Meditation Audio
//!
//! Reverie turns a spoken narration and an optional ambient soundscape into
//! a single playable WAV file.
//!
//! # Architecture
//!
//! The pipeline runs in four stages:
//! - Load: fetch and decode the narration (mandatory) and the background (optional)
//! - Compose: loop and attenuate the background under the narration
//! - Encode: write 16-bit PCM WAV under a content-addressed name
//! - Fallback: whenever the background cannot be used, return the narration as-is
//!
//! ```no_run
//! use reverie::config::PipelineConfig;
//! use reverie::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::from_config(PipelineConfig::from_env())?;
//! let production = pipeline.produce("voice.mp3", Some("https://cdn.example.com/ambient.mp3"))?;
//! println!("{}", production.reference);
//! # Ok::<(), reverie::ReverieError>(())
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod mix;
pub mod pipeline;
pub mod session;
pub mod tts;

pub use error::{ReverieError, Result};
