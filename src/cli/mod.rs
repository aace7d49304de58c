//! CLI Module
//!
//! Command-line interface for the Reverie mixing pipeline.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Reverie - narrated meditation audio with ambient soundscapes
#[derive(Parser, Debug)]
#[command(name = "reverie")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by commands that run the pipeline
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// JSON pipeline configuration (defaults plus REVERIE_* variables otherwise)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for generated audio
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mix a narration with an optional background
    #[command(name = "mix")]
    Mix {
        /// Narration locator (path, file:// or http(s) URL)
        #[arg(long)]
        voice: String,

        /// Background locator
        #[arg(long, conflicts_with = "soundscape")]
        background: Option<String>,

        /// Built-in soundscape id
        #[arg(long)]
        soundscape: Option<String>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Narrate a script with a built-in voice and mix it with a soundscape
    #[command(name = "narrate")]
    Narrate {
        /// Text file holding the meditation script
        #[arg(short, long)]
        script: PathBuf,

        /// Built-in voice id
        #[arg(long)]
        voice: String,

        /// Built-in soundscape id
        #[arg(long)]
        soundscape: Option<String>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// List built-in voices and soundscapes
    #[command(name = "catalog")]
    Catalog,

    /// Load an audio asset and print its properties
    #[command(name = "inspect")]
    Inspect {
        /// Asset locator
        locator: String,
    },
}
