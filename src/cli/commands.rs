//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;

use tracing::info;

use super::PipelineArgs;
use crate::catalog::{find_soundscape, SOUNDSCAPES, VOICES};
use crate::config::PipelineConfig;
use crate::engine::linear_to_db;
use crate::error::{ReverieError, Result};
use crate::loader::{AssetLoader, DefaultTransport};
use crate::pipeline::{MixOutcome, Pipeline, Production};
use crate::session::{narrate as narrate_session, SessionRequest};
use crate::tts::{ElevenLabsConfig, ElevenLabsSynthesizer};

/// Resolve the pipeline configuration for a command
pub fn resolve_config(args: &PipelineArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::from_env(),
    };

    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Mix a narration with an explicit background or a built-in soundscape.
pub fn mix(voice: &str, background: Option<&str>, soundscape: Option<&str>, args: &PipelineArgs) -> Result<()> {
    let background = match soundscape {
        Some(id) => Some(find_soundscape(id)?.url),
        None => background,
    };

    let pipeline = Pipeline::from_config(resolve_config(args)?)?;
    let production = pipeline.produce(voice, background)?;
    print_production(&production);

    Ok(())
}

/// Synthesize a script and mix it with a soundscape.
pub fn narrate(script: &std::path::Path, voice: &str, soundscape: Option<&str>, args: &PipelineArgs) -> Result<()> {
    let text = fs::read_to_string(script)?;
    info!(script = %script.display(), chars = text.len(), "Read script");

    let config = resolve_config(args)?;
    let synthesizer = ElevenLabsSynthesizer::new(ElevenLabsConfig::from_env()?, config.output_dir.clone())?;
    let pipeline = Pipeline::from_config(config)?;

    let request = SessionRequest {
        script: text,
        voice: voice.to_string(),
        soundscape: soundscape.map(str::to_string),
    };
    let production = narrate_session(&pipeline, &synthesizer, &request)?;
    print_production(&production);

    Ok(())
}

/// List built-in voices and soundscapes.
pub fn catalog() -> Result<()> {
    println!("Voices:");
    println!("{:-<60}", "");
    for voice in VOICES {
        println!("  {:<12} {:<12} {}", voice.id, voice.name, voice.description);
    }

    println!();
    println!("Soundscapes:");
    println!("{:-<60}", "");
    for soundscape in SOUNDSCAPES {
        println!("  {:<12} {:<20} {}", soundscape.id, soundscape.name, soundscape.description);
    }

    Ok(())
}

/// Load one asset and print what was decoded.
pub fn inspect(locator: &str) -> Result<()> {
    let config = PipelineConfig::from_env();
    let loader = AssetLoader::new(DefaultTransport::new(config.fetch_timeout())?);
    let asset = loader.load(locator, "asset").map_err(ReverieError::from)?;
    let buffer = &asset.buffer;

    println!("Locator:     {}", asset.locator);
    println!("Size:        {} bytes", asset.bytes.len());
    println!("Sample rate: {} Hz", buffer.sample_rate());
    println!("Channels:    {}", buffer.channel_count());
    println!("Frames:      {}", buffer.frame_count());
    println!("Duration:    {:.2} s", buffer.duration_secs());
    println!("Peak:        {:.1} dBFS", linear_to_db(buffer.peak()));
    println!("RMS:         {:.1} dBFS", linear_to_db(buffer.rms()));

    Ok(())
}

fn print_production(production: &Production) {
    match &production.outcome {
        MixOutcome::Mixed { content_hash } => {
            println!("Mixed: {}", production.reference);
            println!("SHA-256: {}", content_hash);
        }
        MixOutcome::VoiceOnly(reason) => {
            println!("Voice only ({}): {}", reason, production.reference);
        }
    }
}
