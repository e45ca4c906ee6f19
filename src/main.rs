//! Stemsep CLI - two-stem separation and noise removal
//!
//! Command-line entry point for the Stemsep pipeline.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;

use stemsep::cli::{commands, Cli, Commands};
use stemsep::separate::ChannelSeparator;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    info!("Stemsep v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Stemsep v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    let separator = build_separator();

    match cmd {
        Commands::Separate {
            input,
            output_dir,
            mode,
            quality,
            backend,
        } => commands::separate(&separator, &input, &output_dir, &mode, &quality, &backend)
            .with_context(|| format!("separation of {} failed", input.display())),
        Commands::Denoise {
            input,
            output,
            noise_type,
            strength,
        } => commands::denoise(&input, &output, &noise_type, strength)
            .with_context(|| format!("denoising of {} failed", input.display())),
        Commands::CleanStems {
            vocals,
            accompaniment,
            output_dir,
            strength,
        } => commands::clean_stems(&vocals, &accompaniment, &output_dir, strength)
            .context("stem cleanup failed"),
        Commands::Check => commands::check(&separator).context("environment check failed"),
    }
}

/// The model handle is created once per process; everything else is
/// per-call state
#[cfg(feature = "model-mock")]
fn build_separator() -> ChannelSeparator {
    ChannelSeparator::new(Box::new(stemsep::neural::MockSeparationModel::new()))
}

#[cfg(not(feature = "model-mock"))]
fn build_separator() -> ChannelSeparator {
    ChannelSeparator::without_model()
}
