//! Channel separation
//!
//! First-pass vocal/accompaniment split from a stereo recording. The split
//! comes either from the injected external model or from mid/side math; the
//! separation mode then decides how much post-processing the raw stems get.

pub mod enhance;
pub mod midside;

use log::{info, warn};
use serde::Serialize;

use crate::denoise::{NoiseRemover, NoiseType};
use crate::engine::buffer::{AudioBuffer, PEAK_CEILING, TARGET_RMS_DB};
use crate::error::{Result, StemsepError};
use crate::neural::{NullModel, SeparationModel};

pub use enhance::{EnhancerSettings, StemEnhancer};

/// Strength used for the inline denoise pass in enhanced mode
const INLINE_DENOISE_STRENGTH: f32 = 0.5;

/// How much post-processing separated stems receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparationMode {
    /// Full chain: refinement, stem enhancement, inline denoise
    Enhanced,
    /// Refined split with per-stem normalization, no enhancement
    Clean,
    /// Raw mid/side split only; the always-available conservative path
    Fallback,
}

impl SeparationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeparationMode::Enhanced => "enhanced",
            SeparationMode::Clean => "clean",
            SeparationMode::Fallback => "fallback",
        }
    }
}

impl std::str::FromStr for SeparationMode {
    type Err = StemsepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "enhanced" => Ok(SeparationMode::Enhanced),
            "clean" => Ok(SeparationMode::Clean),
            "fallback" => Ok(SeparationMode::Fallback),
            other => Err(StemsepError::InvalidParameter {
                param: "mode".to_string(),
                value: other.to_string(),
                expected: "enhanced, clean, or fallback".to_string(),
            }),
        }
    }
}

/// Quality tier; maps deterministically to the processing sample rate of
/// the algorithmic path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    High,
    Medium,
    Low,
}

impl Quality {
    pub fn target_sample_rate(&self) -> u32 {
        match self {
            Quality::High => 44_100,
            Quality::Medium => 22_050,
            Quality::Low => 16_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::High => "high",
            Quality::Medium => "medium",
            Quality::Low => "low",
        }
    }
}

impl std::str::FromStr for Quality {
    type Err = StemsepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "high" => Ok(Quality::High),
            "medium" => Ok(Quality::Medium),
            "low" => Ok(Quality::Low),
            other => Err(StemsepError::InvalidParameter {
                param: "quality".to_string(),
                value: other.to_string(),
                expected: "high, medium, or low".to_string(),
            }),
        }
    }
}

/// Which split implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Prefer the model when one is loaded, otherwise mid/side
    #[default]
    Auto,
    /// Demand the model; fail when none is loaded
    Model,
    /// Force the algorithmic mid/side path
    MidSide,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Auto => "auto",
            Backend::Model => "model",
            Backend::MidSide => "midside",
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = StemsepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Backend::Auto),
            "model" => Ok(Backend::Model),
            "midside" => Ok(Backend::MidSide),
            other => Err(StemsepError::InvalidParameter {
                param: "backend".to_string(),
                value: other.to_string(),
                expected: "auto, model, or midside".to_string(),
            }),
        }
    }
}

/// Output of one separation call
///
/// The stems always share sample rate, length, and channel layout.
#[derive(Debug)]
pub struct SeparationResult {
    pub vocals: AudioBuffer,
    pub accompaniment: AudioBuffer,
    pub sample_rate: u32,
    pub duration_secs: f64,
    /// Which split produced the stems: the model's name or "mid_side"
    pub method: &'static str,
    pub warning: Option<String>,
}

/// Capability report for the active separation method
#[derive(Debug, Clone, Serialize)]
pub struct QualityInfo {
    pub method: String,
    pub quality: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limitation: Option<String>,
}

/// Separation service
///
/// Constructed once per process and shared by reference; each `separate`
/// call is independent with no shared mutable state. The model handle is
/// the only long-lived resource.
pub struct ChannelSeparator {
    model: Box<dyn SeparationModel>,
    enhancer: StemEnhancer,
    remover: NoiseRemover,
}

impl ChannelSeparator {
    pub fn new(model: Box<dyn SeparationModel>) -> Self {
        Self {
            model,
            enhancer: StemEnhancer::new(),
            remover: NoiseRemover::new(),
        }
    }

    /// Separator with no model installed; mid/side only
    pub fn without_model() -> Self {
        Self::new(Box::new(NullModel))
    }

    /// Whether the optional model loaded. This never reflects overall
    /// service usability; the mid/side path works regardless.
    pub fn is_ready(&self) -> bool {
        self.model.is_available()
    }

    /// Describe the separation method the service would currently use
    pub fn quality_info(&self) -> QualityInfo {
        if self.model.is_available() {
            QualityInfo {
                method: self.model.name().to_string(),
                quality: "high".to_string(),
                description: "neural two-stem separation model".to_string(),
                limitation: None,
            }
        } else {
            QualityInfo {
                method: "mid_side".to_string(),
                quality: "basic".to_string(),
                description: "center-channel extraction via mid/side decomposition".to_string(),
                limitation: Some(
                    "stereo recordings only; assumes a center-panned lead vocal".to_string(),
                ),
            }
        }
    }

    /// Split a recording into vocal and accompaniment stems
    pub fn separate(
        &self,
        input: &AudioBuffer,
        mode: SeparationMode,
        quality: Quality,
        backend: Backend,
    ) -> Result<SeparationResult> {
        if input.is_empty() {
            return Err(StemsepError::InvalidParameter {
                param: "input".to_string(),
                value: "empty waveform".to_string(),
                expected: "at least one sample".to_string(),
            });
        }
        if input.channels() > 2 {
            return Err(StemsepError::UnsupportedFormat {
                format: format!("{}-channel audio", input.channels()),
            });
        }

        let use_model = match backend {
            Backend::Model => {
                if !self.model.is_available() {
                    return Err(StemsepError::ModelUnavailable {
                        detail: "model backend requested but no model is loaded".to_string(),
                    });
                }
                true
            }
            Backend::Auto => self.model.is_available(),
            Backend::MidSide => false,
        };

        info!(
            "separating: mode={}, quality={}, backend={}, model={}",
            mode.as_str(),
            quality.as_str(),
            backend.as_str(),
            if use_model { self.model.name() } else { "unused" }
        );

        let (mut vocals, mut accompaniment, method, warning) = if use_model {
            self.split_with_model(input)?
        } else {
            self.split_mid_side(input, mode, quality)?
        };

        if mode == SeparationMode::Enhanced {
            let (v, a) = self.enhancer.enhance(&vocals, &accompaniment);
            vocals = v;
            accompaniment = a;

            // Inline artifact cleanup; failures degrade to the enhanced stems
            for (name, stem) in [("vocals", &mut vocals), ("accompaniment", &mut accompaniment)] {
                match self
                    .remover
                    .remove_noise(stem, NoiseType::Auto, INLINE_DENOISE_STRENGTH)
                {
                    Ok(cleaned) => *stem = cleaned.audio,
                    Err(e) => warn!("inline denoise of {} skipped: {}", name, e),
                }
            }
        }

        crate::dsp::levels::normalize_rms(&mut vocals, TARGET_RMS_DB, PEAK_CEILING);
        crate::dsp::levels::normalize_rms(&mut accompaniment, TARGET_RMS_DB, PEAK_CEILING);

        debug_assert_eq!(vocals.len(), accompaniment.len());
        let sample_rate = vocals.sample_rate;
        let duration_secs = vocals.duration_secs();

        Ok(SeparationResult {
            vocals,
            accompaniment,
            sample_rate,
            duration_secs,
            method,
            warning,
        })
    }

    fn split_with_model(
        &self,
        input: &AudioBuffer,
    ) -> Result<(AudioBuffer, AudioBuffer, &'static str, Option<String>)> {
        let resampled = input.resample(self.model.sample_rate());
        let rate = resampled.sample_rate;

        // Mono sources become a synthetic stereo pair; the model contract
        // tolerates identical channels
        let left = resampled.channel(0);
        let right = if resampled.channels() == 2 {
            resampled.channel(1)
        } else {
            resampled.channel(0)
        };

        let stems = self.model.separate(left, right)?;
        let vocals = AudioBuffer::from_mono(stems.vocals, rate);
        let accompaniment = AudioBuffer::from_mono(stems.accompaniment, rate);

        Ok((vocals, accompaniment, self.model.name(), None))
    }

    fn split_mid_side(
        &self,
        input: &AudioBuffer,
        mode: SeparationMode,
        quality: Quality,
    ) -> Result<(AudioBuffer, AudioBuffer, &'static str, Option<String>)> {
        if input.channels() < 2 {
            return Err(StemsepError::UnseparableInput {
                reason: "mono input carries no spatial cue for mid/side separation; \
                         provide a stereo recording or load a separation model"
                    .to_string(),
            });
        }

        let resampled = input.resample(quality.target_sample_rate());
        let rate = resampled.sample_rate;
        let left = resampled.channel(0);
        let right = resampled.channel(1);

        let (mut mid, mut side) = midside::split(left, right);

        // High quality refines both stems; fallback mode stays a pure split
        if quality == Quality::High && mode != SeparationMode::Fallback {
            let refined_mid = midside::enhance_center(left, right, &mid);
            let refined_side = midside::enhance_side(&side, &mid, rate);
            mid = refined_mid;
            side = refined_side;
        }

        let vocals = AudioBuffer::from_mono(mid, rate);
        let accompaniment = AudioBuffer::from_mono(side, rate);
        let warning = Some(
            "mid/side separation in use; quality depends on a center-panned lead vocal"
                .to_string(),
        );

        Ok((vocals, accompaniment, "mid_side", warning))
    }
}
