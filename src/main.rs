//! Reverie CLI - Meditation Audio Mixer
//!
//! Command-line interface for the Reverie mixing pipeline.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reverie::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    info!("Reverie v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Reverie v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Mix {
            voice,
            background,
            soundscape,
            pipeline,
        } => commands::mix(&voice, background.as_deref(), soundscape.as_deref(), &pipeline)
            .with_context(|| format!("mix of {} failed", voice)),
        Commands::Narrate {
            script,
            voice,
            soundscape,
            pipeline,
        } => commands::narrate(&script, &voice, soundscape.as_deref(), &pipeline)
            .with_context(|| format!("narration from {} failed", script.display())),
        Commands::Catalog => commands::catalog().context("cannot list catalog"),
        Commands::Inspect { locator } => {
            commands::inspect(&locator).with_context(|| format!("cannot inspect {}", locator))
        }
    }
}
