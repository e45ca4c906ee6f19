//! CLI Module
//!
//! Command-line interface for the Stemsep pipeline. Enum-valued flags are
//! taken as strings and validated by the library's `FromStr` impls so
//! unknown values fail fast with a descriptive error.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stemsep - two-stem separation and noise removal
#[derive(Parser, Debug)]
#[command(name = "stemsep")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Separate a recording into vocal and accompaniment stems
    #[command(name = "separate")]
    Separate {
        /// Input audio file (WAV)
        input: PathBuf,

        /// Directory receiving vocals.wav and accompaniment.wav
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Separation mode: enhanced, clean, or fallback
        #[arg(short, long, default_value = "clean")]
        mode: String,

        /// Quality tier: high, medium, or low
        #[arg(short, long, default_value = "high")]
        quality: String,

        /// Split backend: auto, model, or midside
        #[arg(short, long, default_value = "auto")]
        backend: String,
    },

    /// Remove noise from a single audio file
    #[command(name = "denoise")]
    Denoise {
        /// Input audio file (WAV)
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Noise type: auto, white, hiss, or hum
        #[arg(short, long, default_value = "auto")]
        noise_type: String,

        /// Denoise strength, 0.0 to 1.0
        #[arg(short, long, default_value_t = 0.8)]
        strength: f32,
    },

    /// Clean separation artifacts from a pair of stems
    #[command(name = "clean-stems")]
    CleanStems {
        /// Vocal stem file (WAV)
        vocals: PathBuf,

        /// Accompaniment stem file (WAV)
        accompaniment: PathBuf,

        /// Directory receiving the cleaned stems
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Cleanup strength, 0.0 to 1.0
        #[arg(short, long, default_value_t = 0.8)]
        strength: f32,
    },

    /// Report separation backend readiness
    #[command(name = "check")]
    Check,
}
