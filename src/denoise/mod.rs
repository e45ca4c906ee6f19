//! Noise classification and removal
//!
//! Detects the dominant noise character of a signal (broadband, hiss, hum)
//! and applies the matching remediation chain per channel, followed by a
//! gentle smoothing pass and, for stereo input, a coherence correction that
//! shrinks decorrelated inter-channel noise. The per-channel chains are
//! best-effort; parameter validation is not.

pub mod chains;
pub mod classify;

use log::{debug, info, warn};

use crate::dsp::biquad::{filtfilt, BiquadCoeffs};
use crate::dsp::levels::{buffer_energy, correlation};
use crate::engine::buffer::AudioBuffer;
use crate::error::{Result, StemsepError};
use crate::separate::midside;

pub use classify::{classify, NoiseClass, NoiseProfile};

/// L/R correlation above which the coherence pass engages. Below it,
/// decorrelated content is assumed to be intentional stereo, not noise.
const COHERENCE_THRESHOLD: f32 = 0.5;

/// The coherence pass runs at a fraction of the caller's strength
const COHERENCE_STRENGTH_SCALE: f32 = 0.3;

/// Blend of smoothed vs. original signal in the post-chain smoothing pass
const SMOOTHING_MIX: f32 = 0.95;

/// Caller-facing noise type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseType {
    /// Detect per channel from spectral shape
    Auto,
    White,
    Hiss,
    Hum,
}

impl NoiseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoiseType::Auto => "auto",
            NoiseType::White => "white",
            NoiseType::Hiss => "hiss",
            NoiseType::Hum => "hum",
        }
    }
}

impl std::str::FromStr for NoiseType {
    type Err = StemsepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(NoiseType::Auto),
            "white" => Ok(NoiseType::White),
            "hiss" => Ok(NoiseType::Hiss),
            "hum" => Ok(NoiseType::Hum),
            other => Err(StemsepError::InvalidParameter {
                param: "noise_type".to_string(),
                value: other.to_string(),
                expected: "auto, white, hiss, or hum".to_string(),
            }),
        }
    }
}

/// One cleaned stem plus its reduction estimate
///
/// The dB figure is a crude energy ratio, `10*log10(E_in / E_out)`, not a
/// perceptual measure; it goes negative when cleanup added energy.
#[derive(Debug, Clone)]
pub struct CleanedStem {
    pub audio: AudioBuffer,
    pub noise_reduction_db: f32,
    pub sample_rate: u32,
}

/// Result of cleaning both separation stems
///
/// Per-stem results are kept individually so a caller can use the stem that
/// succeeded even when the other failed.
#[derive(Debug)]
pub struct ArtifactCleanup {
    pub success: bool,
    pub vocals: Result<CleanedStem>,
    pub accompaniment: Result<CleanedStem>,
    /// Mean reduction over the stems that succeeded; `None` if neither did
    pub average_reduction_db: Option<f32>,
}

/// Noise removal service
#[derive(Debug, Clone, Copy, Default)]
pub struct NoiseRemover;

impl NoiseRemover {
    pub fn new() -> Self {
        Self
    }

    /// Remove noise of the given (or detected) type from a waveform
    ///
    /// `strength` must be in [0, 1]. Stereo channels are processed
    /// independently, each with its own auto-detection, then passed through
    /// the coherence correction.
    pub fn remove_noise(
        &self,
        input: &AudioBuffer,
        noise_type: NoiseType,
        strength: f32,
    ) -> Result<CleanedStem> {
        if !(0.0..=1.0).contains(&strength) || !strength.is_finite() {
            return Err(StemsepError::InvalidParameter {
                param: "strength".to_string(),
                value: strength.to_string(),
                expected: "0.0 to 1.0".to_string(),
            });
        }
        if input.is_empty() {
            return Err(StemsepError::InvalidParameter {
                param: "input".to_string(),
                value: "empty waveform".to_string(),
                expected: "at least one sample".to_string(),
            });
        }

        info!(
            "removing noise: type={}, strength={:.2}, {} channel(s), {} Hz",
            noise_type.as_str(),
            strength,
            input.channels(),
            input.sample_rate
        );

        let original_energy = buffer_energy(input);

        let mut cleaned = input.clone();
        for channel in &mut cleaned.samples {
            *channel = self.process_channel(channel, input.sample_rate, noise_type, strength);
        }

        if cleaned.channels() == 2 {
            self.coherence_pass(&mut cleaned, strength * COHERENCE_STRENGTH_SCALE);
        }

        let cleaned_energy = buffer_energy(&cleaned);
        let noise_reduction_db = if original_energy > 0.0 && cleaned_energy > 0.0 {
            10.0 * (original_energy / cleaned_energy).log10()
        } else {
            0.0
        };

        info!("noise removal done: {:.1} dB reduction", noise_reduction_db);

        Ok(CleanedStem {
            sample_rate: cleaned.sample_rate,
            audio: cleaned,
            noise_reduction_db,
        })
    }

    /// Clean both separation stems and report per-stem outcomes
    ///
    /// Runs auto-detection on each stem independently. A failed stem does
    /// not discard the other: the report carries whichever partial result
    /// succeeded.
    pub fn remove_separation_artifacts(
        &self,
        vocals: &AudioBuffer,
        accompaniment: &AudioBuffer,
        strength: f32,
    ) -> ArtifactCleanup {
        let vocals_result = self.remove_noise(vocals, NoiseType::Auto, strength);
        let accompaniment_result = self.remove_noise(accompaniment, NoiseType::Auto, strength);

        let reductions: Vec<f32> = [&vocals_result, &accompaniment_result]
            .iter()
            .filter_map(|r| r.as_ref().ok().map(|c| c.noise_reduction_db))
            .collect();
        let average_reduction_db = if reductions.is_empty() {
            None
        } else {
            Some(reductions.iter().sum::<f32>() / reductions.len() as f32)
        };

        let success = vocals_result.is_ok() && accompaniment_result.is_ok();
        if !success {
            warn!("artifact cleanup failed for at least one stem");
        }

        ArtifactCleanup {
            success,
            vocals: vocals_result,
            accompaniment: accompaniment_result,
            average_reduction_db,
        }
    }

    /// Run one channel through its remediation chain, best-effort
    fn process_channel(
        &self,
        samples: &[f32],
        sample_rate: u32,
        noise_type: NoiseType,
        strength: f32,
    ) -> Vec<f32> {
        let class = match noise_type {
            NoiseType::White => NoiseClass::White,
            NoiseType::Hiss => NoiseClass::Hiss,
            NoiseType::Hum => NoiseClass::Hum,
            NoiseType::Auto => {
                let profile = classify::classify(samples, sample_rate);
                debug!(
                    "detected noise class: {} (floor {:.5})",
                    profile.class.as_str(),
                    profile.noise_floor
                );
                profile.class
            }
        };

        let result = match class {
            NoiseClass::White => chains::white_chain(samples, sample_rate, strength),
            NoiseClass::Hiss => chains::hiss_chain(samples, sample_rate, strength),
            NoiseClass::Hum => chains::hum_chain(samples, sample_rate, strength),
            NoiseClass::Unknown => chains::general_chain(samples, sample_rate, strength),
        };

        match result {
            Ok(cleaned)
                if cleaned.len() == samples.len()
                    && cleaned.iter().all(|s| s.is_finite()) =>
            {
                self.smooth(&cleaned, sample_rate)
            }
            Ok(_) => {
                warn!(
                    "{} chain produced degenerate output, keeping channel unprocessed",
                    class.as_str()
                );
                samples.to_vec()
            }
            Err(e) => {
                warn!("{} chain skipped: {}", class.as_str(), e);
                samples.to_vec()
            }
        }
    }

    /// Gentle low-pass blend that rounds off chain discontinuities
    fn smooth(&self, samples: &[f32], sample_rate: u32) -> Vec<f32> {
        let cutoff = sample_rate as f64 * 0.4;
        let mut smoothed = samples.to_vec();
        filtfilt(
            &[BiquadCoeffs::low_pass(sample_rate as f64, cutoff, std::f64::consts::FRAC_1_SQRT_2)],
            &mut smoothed,
        );

        smoothed
            .iter()
            .zip(samples)
            .map(|(&s, &o)| SMOOTHING_MIX * s + (1.0 - SMOOTHING_MIX) * o)
            .collect()
    }

    /// Shrink the decorrelated side component of highly-correlated stereo
    fn coherence_pass(&self, buffer: &mut AudioBuffer, effective_strength: f32) {
        let corr = correlation(buffer.channel(0), buffer.channel(1));
        if corr <= COHERENCE_THRESHOLD {
            debug!("coherence pass skipped: correlation {:.2}", corr);
            return;
        }

        let (mid, side) = midside::split(buffer.channel(0), buffer.channel(1));
        let gain = 1.0 - effective_strength;
        let side: Vec<f32> = side.iter().map(|s| s * gain).collect();
        let (left, right) = midside::join(&mid, &side);

        buffer.samples[0] = left;
        buffer.samples[1] = right;
    }
}
