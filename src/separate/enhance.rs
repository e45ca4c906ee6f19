//! Stem enhancement
//!
//! Post-processes the raw stems so each one carries less of the other's
//! residue: spectral subtraction with the opposite stem as the noise
//! estimate, adaptive gating anchored on the stem's own noise floor,
//! frequency shaping around the vocal bands, a soft-knee compressor, and a
//! conservative stereo-width stage for stereo accompaniment.
//!
//! Every stage runs best-effort: a stage that fails or produces non-finite
//! output is skipped and the previous stage's signal passes through
//! unchanged. Enhancement never aborts a separation call.

use log::{debug, warn};

use crate::dsp::biquad::{filtfilt, BiquadCoeffs};
use crate::dsp::levels::{percentile, rms};
use crate::dsp::spectral::{subtract_noise, SubtractionParams};
use crate::dsp::stft::{istft, stft, StftConfig};
use crate::engine::buffer::AudioBuffer;
use crate::error::{Result, StemsepError};
use crate::separate::midside;

/// Vocal fundamental range boosted in the vocal stem and cut in the
/// accompaniment, in Hz
const FUNDAMENTAL_RANGE_HZ: (f64, f64) = (85.0, 255.0);

/// Formant centers and per-pass peak gains in dB (the zero-phase run applies
/// each twice)
const FORMANT_BANDS: [(f64, f64); 3] = [(500.0, 1.25), (1500.0, 1.0), (2500.0, 1.0)];

/// Mix level of the band-passed fundamental component
const FUNDAMENTAL_MIX: f32 = 0.25;

/// Tuning for the enhancement stages
#[derive(Debug, Clone, Copy)]
pub struct EnhancerSettings {
    /// Over-subtraction factor for residual suppression (0.8-2.0); higher
    /// removes more residue but risks musical noise
    pub subtraction_alpha: f32,
    /// Fraction of each bin's original power that must survive subtraction
    /// (0.1-0.3)
    pub power_floor: f32,
    /// Gain applied to sub-floor regions by the adaptive gate; attenuation,
    /// never a hard mute, to avoid gate breathing
    pub gate_attenuation: f32,
    /// Side gain for the accompaniment width stage; kept modest on purpose,
    /// larger values amplify the noise floor along with the image
    pub side_gain: f32,
    /// Compressor threshold in dBFS
    pub comp_threshold_db: f32,
    /// Compressor ratio (n:1)
    pub comp_ratio: f32,
    /// Compressor knee width in dB
    pub comp_knee_db: f32,
}

impl Default for EnhancerSettings {
    fn default() -> Self {
        Self {
            subtraction_alpha: 1.4,
            power_floor: 0.2,
            gate_attenuation: 0.5,
            side_gain: 1.1,
            comp_threshold_db: -12.0,
            comp_ratio: 3.0,
            comp_knee_db: 6.0,
        }
    }
}

impl EnhancerSettings {
    /// Light-touch tier: minimal subtraction, high floor
    pub fn gentle() -> Self {
        Self {
            subtraction_alpha: 0.8,
            power_floor: 0.3,
            ..Self::default()
        }
    }

    /// Maximum-suppression tier, at higher artifact risk
    pub fn aggressive() -> Self {
        Self {
            subtraction_alpha: 2.0,
            power_floor: 0.1,
            ..Self::default()
        }
    }
}

/// Per-stem enhancement pipeline
#[derive(Debug, Clone, Default)]
pub struct StemEnhancer {
    settings: EnhancerSettings,
}

impl StemEnhancer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: EnhancerSettings) -> Self {
        Self { settings }
    }

    /// Refine both stems against each other
    ///
    /// Infallible at this level: stage failures degrade to pass-through.
    pub fn enhance(
        &self,
        vocals: &AudioBuffer,
        accompaniment: &AudioBuffer,
    ) -> (AudioBuffer, AudioBuffer) {
        let v = best_effort("vocal_residual_subtraction", vocals, |b| {
            self.suppress_residual(b, accompaniment)
        });
        let v = best_effort("vocal_gate", &v, |b| self.adaptive_gate(b));
        let v = best_effort("vocal_shaping", &v, |b| self.shape(b, ShapeDirection::Boost));
        let v = best_effort("vocal_compressor", &v, |b| self.compress(b));

        let a = best_effort("accompaniment_residual_subtraction", accompaniment, |b| {
            self.suppress_residual(b, vocals)
        });
        let a = best_effort("accompaniment_gate", &a, |b| self.adaptive_gate(b));
        let a = best_effort("accompaniment_shaping", &a, |b| {
            self.shape(b, ShapeDirection::Cut)
        });
        let a = best_effort("accompaniment_compressor", &a, |b| self.compress(b));
        // Width only applies to a stereo accompaniment; mono stems skip it
        let a = if a.channels() == 2 {
            best_effort("accompaniment_width", &a, |b| self.widen(b))
        } else {
            a
        };

        (v, a)
    }

    /// Subtract the other stem's average spectrum from this stem
    fn suppress_residual(&self, stem: &AudioBuffer, other: &AudioBuffer) -> Result<AudioBuffer> {
        let config = StftConfig::default();
        let noise = stft(other.to_mono().channel(0), config, other.sample_rate).average_power();

        let params = SubtractionParams::residual(self.settings.subtraction_alpha, self.settings.power_floor);
        let mut out = stem.clone();
        for channel in &mut out.samples {
            let mut spec = stft(channel, config, stem.sample_rate);
            subtract_noise(&mut spec, &noise, params);
            *channel = istft(&spec);
        }
        Ok(out)
    }

    /// Attenuate regions below twice the stem's own noise floor
    ///
    /// The floor is a low percentile of windowed RMS; window gains are
    /// interpolated sample-wise so the gate never switches abruptly.
    fn adaptive_gate(&self, stem: &AudioBuffer) -> Result<AudioBuffer> {
        const WINDOW: usize = 1024;

        let mut out = stem.clone();
        for channel in &mut out.samples {
            if channel.len() < WINDOW * 2 {
                continue;
            }

            let window_rms: Vec<f32> = channel.chunks(WINDOW).map(rms).collect();
            let noise_floor = percentile(&window_rms, 10.0);
            if noise_floor <= 1e-8 {
                continue;
            }

            let threshold = 2.0 * noise_floor;
            let gains: Vec<f32> = window_rms
                .iter()
                .map(|&level| {
                    if level < threshold {
                        self.settings.gate_attenuation
                    } else {
                        1.0
                    }
                })
                .collect();

            for (i, sample) in channel.iter_mut().enumerate() {
                *sample *= interpolated_gain(&gains, WINDOW, i);
            }
        }
        Ok(out)
    }

    /// Frequency shaping around the vocal bands
    ///
    /// Boost direction for the vocal stem; the mirror-image cut for the
    /// accompaniment, where energy at these bands is more likely leaked
    /// vocal than genuine instrument content. Cuts are gentle, never a hard
    /// notch.
    fn shape(&self, stem: &AudioBuffer, direction: ShapeDirection) -> Result<AudioBuffer> {
        let sr = stem.sample_rate as f64;
        let (lo, hi) = FUNDAMENTAL_RANGE_HZ;
        let center = (lo * hi).sqrt();
        let q = center / (hi - lo);
        let band = BiquadCoeffs::band_pass(sr, center, q);

        let sign = match direction {
            ShapeDirection::Boost => 1.0_f32,
            ShapeDirection::Cut => -0.8,
        };

        let mut out = stem.clone();
        for channel in &mut out.samples {
            // Fundamental range: add or remove a band-passed component
            let mut fundamental = channel.clone();
            filtfilt(&[band], &mut fundamental);
            for (sample, &f) in channel.iter_mut().zip(&fundamental) {
                *sample += sign * FUNDAMENTAL_MIX * f;
            }

            // Formant bands: gentle peaks, mirrored per direction
            for &(freq, gain_db) in &FORMANT_BANDS {
                let peak = BiquadCoeffs::peak(sr, freq, 1.4, sign as f64 * gain_db);
                filtfilt(&[peak], channel);
            }
        }
        Ok(out)
    }

    /// Offline soft-knee compressor over linked channels
    fn compress(&self, stem: &AudioBuffer) -> Result<AudioBuffer> {
        let num_samples = stem.len();
        if num_samples == 0 {
            return Ok(stem.clone());
        }

        let attack_coeff = one_pole_coeff(5.0, stem.sample_rate);
        let release_coeff = one_pole_coeff(50.0, stem.sample_rate);

        let mut out = stem.clone();
        let mut envelope = 0.0_f32;
        for i in 0..num_samples {
            let level = out
                .samples
                .iter()
                .map(|ch| ch[i].abs())
                .fold(0.0_f32, f32::max);

            // Peak follower: fast attack, slow release
            let coeff = if level > envelope {
                attack_coeff
            } else {
                release_coeff
            };
            envelope = coeff * envelope + (1.0 - coeff) * level;

            let gain = db_gain(self.gain_reduction_db(amplitude_db(envelope)));
            for channel in &mut out.samples {
                channel[i] *= gain;
            }
        }
        Ok(out)
    }

    /// Gain reduction in dB for a given input level (soft knee)
    fn gain_reduction_db(&self, input_db: f32) -> f32 {
        let threshold = self.settings.comp_threshold_db;
        let ratio = self.settings.comp_ratio;
        let knee = self.settings.comp_knee_db;

        let knee_start = threshold - knee / 2.0;
        let knee_end = threshold + knee / 2.0;

        if input_db <= knee_start {
            0.0
        } else if input_db >= knee_end {
            (threshold + (input_db - threshold) / ratio) - input_db
        } else {
            // Quadratic transition through the knee
            let t = (input_db - knee_start) / knee;
            let effective_ratio = 1.0 + (ratio - 1.0) * t * t;
            (knee_start + (input_db - knee_start) / effective_ratio) - input_db
        }
    }

    /// Widen a stereo accompaniment via a modest side gain
    fn widen(&self, stem: &AudioBuffer) -> Result<AudioBuffer> {
        if stem.channels() != 2 {
            return Err(StemsepError::StageFailure {
                stage: "accompaniment_width",
                reason: "stereo input required".to_string(),
            });
        }

        let (mid, side) = midside::split(stem.channel(0), stem.channel(1));
        let side: Vec<f32> = side.iter().map(|s| s * self.settings.side_gain).collect();
        let (left, right) = midside::join(&mid, &side);
        AudioBuffer::from_stereo(left, right, stem.sample_rate)
    }
}

#[derive(Debug, Clone, Copy)]
enum ShapeDirection {
    Boost,
    Cut,
}

/// Run one stage, substituting its input when it fails or degenerates
fn best_effort<F>(stage: &'static str, input: &AudioBuffer, run: F) -> AudioBuffer
where
    F: FnOnce(&AudioBuffer) -> Result<AudioBuffer>,
{
    match run(input) {
        Ok(output) if output.is_finite() && output.len() == input.len() => {
            debug!("stage {} applied", stage);
            output
        }
        Ok(_) => {
            warn!("stage {} produced degenerate output, passing input through", stage);
            input.clone()
        }
        Err(e) => {
            warn!("stage {} skipped: {}", stage, e);
            input.clone()
        }
    }
}

/// Linearly interpolate window gains at a sample position
fn interpolated_gain(gains: &[f32], window: usize, sample: usize) -> f32 {
    let center = window as f32 / 2.0;
    let pos = (sample as f32 - center) / window as f32;
    if pos <= 0.0 {
        return gains[0];
    }
    let idx = pos.floor() as usize;
    if idx + 1 >= gains.len() {
        return *gains.last().unwrap_or(&1.0);
    }
    let frac = pos - idx as f32;
    gains[idx] + (gains[idx + 1] - gains[idx]) * frac
}

fn one_pole_coeff(time_ms: f32, sample_rate: u32) -> f32 {
    let samples = time_ms / 1000.0 * sample_rate as f32;
    if samples > 0.0 {
        (-1.0 / samples).exp()
    } else {
        0.0
    }
}

fn amplitude_db(linear: f32) -> f32 {
    if linear > 0.0 {
        20.0 * linear.log10()
    } else {
        -96.0
    }
}

fn db_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}
