//! Per-class noise remediation chains
//!
//! One chain per detected noise class, dispatched exhaustively by the
//! remover. Each chain takes one channel plus a strength in [0,1] and
//! returns the cleaned channel; chains keep the sample count unchanged.

use crate::dsp::biquad::{butterworth_cascade, filtfilt, BiquadCoeffs, FilterType};
use crate::dsp::levels::percentile;
use crate::dsp::spectral::{edge_noise_power, subtract_noise, welch_psd, SubtractionParams};
use crate::dsp::stft::{istft, stft, StftConfig};
use crate::error::Result;

/// Seconds of head/tail assumed noise-only for the broadband estimate
const EDGE_NOISE_SECS: f32 = 0.5;

/// Minimum per-bin amplitude gain for broadband subtraction
const SUBTRACTION_MIN_GAIN: f32 = 0.01;

/// High-band edge for hiss gating, in Hz
const HISS_BAND_EDGE_HZ: f32 = 4000.0;

/// The adaptive high-cut never reaches below this, so voiced content
/// survives even at full strength
const HIGHCUT_FLOOR_HZ: f32 = 8000.0;

/// Mains fundamentals and first two harmonics for both supply families
const HUM_FREQUENCIES_HZ: [f64; 6] = [50.0, 100.0, 150.0, 60.0, 120.0, 180.0];

/// Broadband ("white") noise: spectral subtraction against the quiet edges
pub fn white_chain(samples: &[f32], sample_rate: u32, strength: f32) -> Result<Vec<f32>> {
    let mut spec = stft(samples, StftConfig::default(), sample_rate);
    let noise = edge_noise_power(&spec, EDGE_NOISE_SECS);
    subtract_noise(
        &mut spec,
        &noise,
        SubtractionParams::new(2.0 * strength, SUBTRACTION_MIN_GAIN),
    );
    Ok(istft(&spec))
}

/// High-frequency hiss: per-frame gating above 4 kHz, then an adaptive
/// high-cut that keeps almost all of the signal's cumulative energy
pub fn hiss_chain(samples: &[f32], sample_rate: u32, strength: f32) -> Result<Vec<f32>> {
    // Gate: within each frame, high bins below a dynamic threshold (median
    // high-band power, scaled down as strength rises) are attenuated
    let mut spec = stft(samples, StftConfig::gating(), sample_rate);
    let first_high_bin = (0..spec.num_bins())
        .find(|&bin| spec.bin_frequency(bin) > HISS_BAND_EDGE_HZ)
        .unwrap_or(spec.num_bins());

    let below_gain = 1.0 - 0.8 * strength;
    for frame in &mut spec.frames {
        let high_powers: Vec<f32> = frame[first_high_bin..]
            .iter()
            .map(|v| v.norm_sqr())
            .collect();
        if high_powers.is_empty() {
            continue;
        }
        let threshold = percentile(&high_powers, 50.0) * (2.0 - strength);
        for value in &mut frame[first_high_bin..] {
            if value.norm_sqr() <= threshold {
                *value *= below_gain;
            }
        }
    }
    let mut gated = istft(&spec);

    // High-cut: choose the cutoff that retains 99% - strength*5% of the
    // cumulative Welch energy, floored at 8 kHz
    let (freqs, psd) = welch_psd(&gated, sample_rate, 2048);
    let total: f32 = psd.iter().sum();
    if total > 0.0 {
        let target = total * (0.99 - strength * 0.05);
        let mut cumulative = 0.0_f32;
        let mut cutoff = *freqs.last().unwrap_or(&0.0);
        for (i, &p) in psd.iter().enumerate() {
            cumulative += p;
            if cumulative >= target {
                cutoff = freqs[i];
                break;
            }
        }
        let cutoff = cutoff.max(HIGHCUT_FLOOR_HZ);
        let nyquist = sample_rate as f32 / 2.0;
        if cutoff < nyquist * 0.9 {
            let cascade =
                butterworth_cascade(FilterType::LowPass, sample_rate as f64, cutoff as f64, 6);
            filtfilt(&cascade, &mut gated);
        }
    }

    Ok(gated)
}

/// Mains hum: notch bank over both supply families, then a rumble high-pass
pub fn hum_chain(samples: &[f32], sample_rate: u32, strength: f32) -> Result<Vec<f32>> {
    let mut out = samples.to_vec();
    let nyquist = sample_rate as f64 / 2.0;
    let q = (30.0 * strength as f64).max(1.0);

    for &freq in &HUM_FREQUENCIES_HZ {
        if freq < nyquist {
            filtfilt(&[BiquadCoeffs::notch(sample_rate as f64, freq, q)], &mut out);
        }
    }

    // Strength-scaled rumble cutoff, 20-60 Hz
    let cutoff = 20.0 * (1.0 + 2.0 * strength as f64);
    if cutoff < nyquist {
        let cascade = butterworth_cascade(FilterType::HighPass, sample_rate as f64, cutoff, 4);
        filtfilt(&cascade, &mut out);
    }

    Ok(out)
}

/// General chain for unclassifiable noise: subtraction, a Wiener-style pass,
/// then a sliding-window attenuator for what is left
pub fn general_chain(samples: &[f32], sample_rate: u32, strength: f32) -> Result<Vec<f32>> {
    let cleaned = white_chain(samples, sample_rate, strength)?;
    let cleaned = crate::dsp::spectral::wiener_filter(&cleaned, sample_rate, strength * 0.7);
    Ok(adaptive_window_attenuate(
        &cleaned,
        sample_rate,
        strength * 0.5,
    ))
}

/// Sliding-window adaptive attenuator
///
/// 100 ms windows with quarter-window hop; near-silent windows are strongly
/// suppressed, energetic windows lightly scaled. Per-sample gains average
/// the overlapping window decisions so window boundaries stay inaudible.
fn adaptive_window_attenuate(samples: &[f32], sample_rate: u32, strength: f32) -> Vec<f32> {
    if samples.is_empty() || strength <= 0.0 {
        return samples.to_vec();
    }

    let window = ((sample_rate as f32 * 0.1) as usize).max(4);
    let hop = (window / 4).max(1);

    let mut gain_sum = vec![0.0_f32; samples.len()];
    let mut gain_count = vec![0.0_f32; samples.len()];

    let mut start = 0;
    while start < samples.len() {
        let end = (start + window).min(samples.len());
        let energy = crate::dsp::levels::energy(&samples[start..end]);

        let gain = if energy > 1e-6 {
            (1.0 / (1.0 + strength * 0.1 / energy)).min(1.0)
        } else {
            1.0 - strength * 0.9
        };

        for i in start..end {
            gain_sum[i] += gain;
            gain_count[i] += 1.0;
        }
        if end == samples.len() {
            break;
        }
        start += hop;
    }

    samples
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            if gain_count[i] > 0.0 {
                s * gain_sum[i] / gain_count[i]
            } else {
                s
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::levels::energy;

    fn tone(freq: f32, sample_rate: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    fn pseudo_noise(n: usize, seed: u64) -> Vec<f32> {
        let mut state = seed.max(1);
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (((state >> 32) as f32 / (1u64 << 31) as f32) - 1.0) * 0.5
            })
            .collect()
    }

    #[test]
    fn test_white_chain_reduces_noise_energy() {
        let noise = pseudo_noise(32000, 3);
        let cleaned = white_chain(&noise, 16000, 0.8).unwrap();
        assert_eq!(cleaned.len(), noise.len());
        assert!(energy(&cleaned) < energy(&noise) * 0.5);
    }

    #[test]
    fn test_white_chain_zero_strength_is_gentle() {
        let noise = pseudo_noise(32000, 3);
        let cleaned = white_chain(&noise, 16000, 0.0).unwrap();
        let ratio = energy(&cleaned) / energy(&noise);
        assert!(ratio > 0.9, "zero strength removed too much: {}", ratio);
    }

    #[test]
    fn test_hum_chain_notches_mains() {
        let sr = 16000;
        let hum = tone(60.0, sr as f32, 32000);
        let cleaned = hum_chain(&hum, sr, 1.0).unwrap();
        assert_eq!(cleaned.len(), hum.len());
        assert!(energy(&cleaned) < energy(&hum) * 0.1);
    }

    #[test]
    fn test_hum_chain_preserves_midrange() {
        let sr = 16000;
        let music = tone(1000.0, sr as f32, 32000);
        let cleaned = hum_chain(&music, sr, 1.0).unwrap();
        let ratio = energy(&cleaned) / energy(&music);
        assert!(ratio > 0.9, "midrange damaged: {}", ratio);
    }

    #[test]
    fn test_hiss_chain_keeps_low_content() {
        let sr = 44100;
        let voice = tone(300.0, sr as f32, 44100);
        let cleaned = hiss_chain(&voice, sr, 0.8).unwrap();
        assert_eq!(cleaned.len(), voice.len());
        let ratio = energy(&cleaned) / energy(&voice);
        assert!(ratio > 0.7, "low band damaged: {}", ratio);
    }

    #[test]
    fn test_general_chain_runs_and_reduces() {
        let noise = pseudo_noise(32000, 11);
        let cleaned = general_chain(&noise, 16000, 0.8).unwrap();
        assert_eq!(cleaned.len(), noise.len());
        assert!(energy(&cleaned) < energy(&noise));
    }

    #[test]
    fn test_attenuator_suppresses_silent_windows() {
        let sr = 16000;
        // Loud half followed by near-silence
        let mut signal = tone(440.0, sr as f32, 16000);
        signal.extend(vec![1e-5_f32; 16000]);

        let out = adaptive_window_attenuate(&signal, sr, 0.5);

        let quiet_before = energy(&signal[17000..31000]);
        let quiet_after = energy(&out[17000..31000]);
        assert!(quiet_after < quiet_before * 0.5);

        let loud_after = energy(&out[1000..15000]);
        assert!(loud_after > energy(&signal[1000..15000]) * 0.5);
    }
}
