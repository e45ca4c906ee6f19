//! Noise classification
//!
//! A coarse spectral-shape heuristic, not a learned classifier: mains hum
//! piles energy below 200 Hz, tape/preamp hiss above 2 kHz, and broadband
//! noise spreads flat. Misclassification degrades cleanup quality but never
//! crashes; the remover falls back to the general chain for anything the
//! detector cannot place.

use crate::dsp::levels::{percentile, rms};
use crate::dsp::stft::{stft, StftConfig};

/// Band edges for the three-way power split, in Hz
const LOW_BAND_EDGE_HZ: f32 = 200.0;
const HIGH_BAND_EDGE_HZ: f32 = 2000.0;

/// Share of total power a band must hold to dominate the classification
const DOMINANCE_RATIO: f32 = 0.4;

/// Detected noise character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseClass {
    /// Broadband, spectrally flat
    White,
    /// High-frequency dominant
    Hiss,
    /// Low-frequency dominant (mains hum and harmonics)
    Hum,
    /// Nothing measurable; handled by the general chain
    Unknown,
}

impl NoiseClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoiseClass::White => "white",
            NoiseClass::Hiss => "hiss",
            NoiseClass::Hum => "hum",
            NoiseClass::Unknown => "unknown",
        }
    }
}

/// Per-call noise characterization; derived from the input, never persisted
#[derive(Debug, Clone, Copy)]
pub struct NoiseProfile {
    pub class: NoiseClass,
    /// Low-percentile RMS amplitude, a rough noise-floor anchor
    pub noise_floor: f32,
}

/// Classify the dominant noise character of one channel
pub fn classify(samples: &[f32], sample_rate: u32) -> NoiseProfile {
    let spec = stft(samples, StftConfig::default(), sample_rate);
    let avg_power = spec.average_power();

    let mut low = BandAverage::default();
    let mut mid = BandAverage::default();
    let mut high = BandAverage::default();
    for (bin, &power) in avg_power.iter().enumerate() {
        let freq = spec.bin_frequency(bin);
        if freq < LOW_BAND_EDGE_HZ {
            low.add(power);
        } else if freq < HIGH_BAND_EDGE_HZ {
            mid.add(power);
        } else {
            high.add(power);
        }
    }

    let total = low.mean() + mid.mean() + high.mean();
    let class = if !total.is_finite() || total <= 0.0 {
        NoiseClass::Unknown
    } else if low.mean() / total > DOMINANCE_RATIO {
        NoiseClass::Hum
    } else if high.mean() / total > DOMINANCE_RATIO {
        NoiseClass::Hiss
    } else {
        NoiseClass::White
    };

    NoiseProfile {
        class,
        noise_floor: estimate_noise_floor(samples),
    }
}

/// Low-percentile windowed RMS as a noise-floor anchor
fn estimate_noise_floor(samples: &[f32]) -> f32 {
    const WINDOW: usize = 1024;
    if samples.len() < WINDOW {
        return rms(samples);
    }
    let window_rms: Vec<f32> = samples.chunks(WINDOW).map(rms).collect();
    percentile(&window_rms, 20.0)
}

#[derive(Debug, Default)]
struct BandAverage {
    sum: f32,
    count: usize,
}

impl BandAverage {
    fn add(&mut self, value: f32) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f32
        }
    }
}
