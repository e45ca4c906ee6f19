//! CLI command implementations
//!
//! Each command loads audio, drives the corresponding pipeline service, and
//! prints a JSON metadata record to stdout; stem audio goes to WAV files.

use std::path::Path;
use std::str::FromStr;

use log::{info, warn};
use serde::Serialize;

use crate::denoise::{NoiseRemover, NoiseType};
use crate::engine::io::{export_audio, import_audio};
use crate::error::Result;
use crate::separate::{Backend, ChannelSeparator, Quality, QualityInfo, SeparationMode};

#[derive(Debug, Serialize)]
struct SeparationMetadata {
    success: bool,
    vocals_path: String,
    accompaniment_path: String,
    method: String,
    sample_rate: u32,
    duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

#[derive(Debug, Serialize)]
struct DenoiseMetadata {
    success: bool,
    output_path: String,
    noise_reduction_db: f32,
    sample_rate: u32,
    duration_secs: f64,
}

#[derive(Debug, Serialize)]
struct StemStatus {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    noise_reduction_db: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct CleanupMetadata {
    success: bool,
    vocals: StemStatus,
    accompaniment: StemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    average_reduction_db: Option<f32>,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    model_ready: bool,
    separation: QualityInfo,
}

/// Separate an input recording into two stem files
pub fn separate(
    separator: &ChannelSeparator,
    input: &Path,
    output_dir: &Path,
    mode: &str,
    quality: &str,
    backend: &str,
) -> Result<()> {
    let mode = SeparationMode::from_str(mode)?;
    let quality = Quality::from_str(quality)?;
    let backend = Backend::from_str(backend)?;

    info!("separating {}", input.display());
    let audio = import_audio(input)?;
    let result = separator.separate(&audio, mode, quality, backend)?;

    std::fs::create_dir_all(output_dir)?;
    let vocals_path = output_dir.join("vocals.wav");
    let accompaniment_path = output_dir.join("accompaniment.wav");
    export_audio(&result.vocals, &vocals_path)?;
    export_audio(&result.accompaniment, &accompaniment_path)?;

    if let Some(warning) = &result.warning {
        warn!("{}", warning);
    }

    print_json(&SeparationMetadata {
        success: true,
        vocals_path: vocals_path.display().to_string(),
        accompaniment_path: accompaniment_path.display().to_string(),
        method: result.method.to_string(),
        sample_rate: result.sample_rate,
        duration_secs: result.duration_secs,
        warning: result.warning,
    })
}

/// Remove noise from a single file
pub fn denoise(input: &Path, output: &Path, noise_type: &str, strength: f32) -> Result<()> {
    let noise_type = NoiseType::from_str(noise_type)?;

    info!("denoising {}", input.display());
    let audio = import_audio(input)?;
    let cleaned = NoiseRemover::new().remove_noise(&audio, noise_type, strength)?;
    export_audio(&cleaned.audio, output)?;

    print_json(&DenoiseMetadata {
        success: true,
        output_path: output.display().to_string(),
        noise_reduction_db: cleaned.noise_reduction_db,
        sample_rate: cleaned.sample_rate,
        duration_secs: cleaned.audio.duration_secs(),
    })
}

/// Clean separation artifacts from both stems
///
/// A failed stem is reported but does not discard the other stem's result.
pub fn clean_stems(
    vocals: &Path,
    accompaniment: &Path,
    output_dir: &Path,
    strength: f32,
) -> Result<()> {
    info!(
        "cleaning stems {} + {}",
        vocals.display(),
        accompaniment.display()
    );
    let vocal_audio = import_audio(vocals)?;
    let accompaniment_audio = import_audio(accompaniment)?;

    let report =
        NoiseRemover::new().remove_separation_artifacts(&vocal_audio, &accompaniment_audio, strength);

    std::fs::create_dir_all(output_dir)?;
    let vocals_status = write_cleaned_stem(
        &report.vocals,
        &output_dir.join("vocals_cleaned.wav"),
    )?;
    let accompaniment_status = write_cleaned_stem(
        &report.accompaniment,
        &output_dir.join("accompaniment_cleaned.wav"),
    )?;

    print_json(&CleanupMetadata {
        success: report.success,
        vocals: vocals_status,
        accompaniment: accompaniment_status,
        average_reduction_db: report.average_reduction_db,
    })
}

/// Report backend readiness
pub fn check(separator: &ChannelSeparator) -> Result<()> {
    print_json(&CheckReport {
        model_ready: separator.is_ready(),
        separation: separator.quality_info(),
    })
}

fn write_cleaned_stem(
    result: &Result<crate::denoise::CleanedStem>,
    path: &Path,
) -> Result<StemStatus> {
    match result {
        Ok(cleaned) => {
            export_audio(&cleaned.audio, path)?;
            Ok(StemStatus {
                success: true,
                output_path: Some(path.display().to_string()),
                noise_reduction_db: Some(cleaned.noise_reduction_db),
                error: None,
            })
        }
        Err(e) => Ok(StemStatus {
            success: false,
            output_path: None,
            noise_reduction_db: None,
            error: Some(e.to_string()),
        }),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
