//! Spectral-domain noise reduction primitives
//!
//! Shared by the stem enhancer (residual suppression, where the opposite
//! stem supplies the noise estimate) and the noise remover (broadband
//! subtraction, where the quiet edges of the signal supply it).

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::dsp::levels::percentile;
use crate::dsp::stft::Spectrogram;

const EPS: f32 = 1e-10;

/// Over-subtraction controls
///
/// `alpha` scales how much of the estimated noise power is removed per bin.
/// `gain_floor` bounds the per-bin amplitude gain from below: pushing bins
/// all the way to zero is what produces musical-noise chirping, so the floor
/// is a hard artifact bound, not an optimization.
#[derive(Debug, Clone, Copy)]
pub struct SubtractionParams {
    pub alpha: f32,
    pub gain_floor: f32,
}

impl SubtractionParams {
    pub fn new(alpha: f32, gain_floor: f32) -> Self {
        Self { alpha, gain_floor }
    }

    /// Residual-suppression tier used between stems: keeps at least 10-30%
    /// of each bin's original power depending on the floor chosen
    pub fn residual(alpha: f32, power_floor: f32) -> Self {
        Self {
            alpha,
            gain_floor: power_floor.clamp(0.0, 1.0).sqrt(),
        }
    }
}

/// Subtract an estimated noise power spectrum from a spectrogram in place
///
/// Per-bin amplitude gain `1 - alpha * noise / signal`, floored at
/// `gain_floor`. `noise_power` must have one entry per bin.
pub fn subtract_noise(spec: &mut Spectrogram, noise_power: &[f32], params: SubtractionParams) {
    for frame in &mut spec.frames {
        for (bin, value) in frame.iter_mut().enumerate() {
            let signal_power = value.norm_sqr();
            let noise = noise_power.get(bin).copied().unwrap_or(0.0);
            let gain = (1.0 - params.alpha * noise / (signal_power + EPS)).max(params.gain_floor);
            *value *= gain;
        }
    }
}

/// Estimate a noise power spectrum from the quiet head and tail of a signal
///
/// Averages bin power over the first and last `edge_secs` of frames, capped
/// at a quarter of the total frame count. The assumption that those edges
/// are noise-only is a documented limitation of this estimator, not a
/// guarantee.
pub fn edge_noise_power(spec: &Spectrogram, edge_secs: f32) -> Vec<f32> {
    let num_frames = spec.num_frames();
    let bins = spec.num_bins();
    if num_frames == 0 {
        return vec![0.0; bins];
    }

    let frames_per_sec = spec.sample_rate as f32 / spec.config.hop_size as f32;
    let edge_frames = ((edge_secs * frames_per_sec) as usize)
        .min(num_frames / 4)
        .max(1);

    let mut power = vec![0.0_f32; bins];
    let mut count = 0usize;
    let head = spec.frames.iter().take(edge_frames);
    let tail = spec.frames.iter().skip(num_frames.saturating_sub(edge_frames));
    for frame in head.chain(tail) {
        for (bin, value) in frame.iter().enumerate() {
            power[bin] += value.norm_sqr();
        }
        count += 1;
    }

    let scale = 1.0 / count.max(1) as f32;
    for p in &mut power {
        *p *= scale;
    }
    power
}

/// Welch power spectral density estimate
///
/// Hann-windowed segments with 50% overlap, periodograms averaged. Returns
/// `(frequencies, psd)` with one entry per positive bin. The segment length
/// shrinks to fit short inputs.
pub fn welch_psd(samples: &[f32], sample_rate: u32, segment: usize) -> (Vec<f32>, Vec<f32>) {
    let segment = segment.min(samples.len().next_power_of_two()).max(2);
    let segment = if segment > samples.len() {
        (samples.len() / 2).max(2)
    } else {
        segment
    };
    let hop = (segment / 2).max(1);
    let bins = segment / 2 + 1;

    let window = crate::dsp::stft::hann_window(segment);
    let window_energy: f32 = window.iter().map(|w| w * w).sum();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(segment);
    let mut buffer = vec![Complex::new(0.0_f32, 0.0); segment];

    let mut psd = vec![0.0_f32; bins];
    let mut count = 0usize;
    let mut start = 0usize;
    while start + segment <= samples.len() {
        for i in 0..segment {
            buffer[i] = Complex::new(samples[start + i] * window[i], 0.0);
        }
        fft.process(&mut buffer);
        for (bin, value) in buffer[..bins].iter().enumerate() {
            psd[bin] += value.norm_sqr() / (window_energy + EPS);
        }
        count += 1;
        start += hop;
    }

    if count > 0 {
        let scale = 1.0 / count as f32;
        for p in &mut psd {
            *p *= scale;
        }
    }

    let freqs = (0..bins)
        .map(|bin| bin as f32 * sample_rate as f32 / segment as f32)
        .collect();
    (freqs, psd)
}

/// Wiener-style denoise over the whole signal
///
/// The gain curve comes from a Welch PSD: the noise floor is the 20th
/// percentile of the PSD, per-band SNR maps to `snr / (snr + 1/strength)`,
/// and the curve is interpolated onto the full-signal spectrum. Zero
/// strength passes the signal through untouched.
pub fn wiener_filter(samples: &[f32], sample_rate: u32, strength: f32) -> Vec<f32> {
    if samples.is_empty() || strength <= 0.0 {
        return samples.to_vec();
    }

    let (freqs, psd) = welch_psd(samples, sample_rate, 2048);
    if psd.is_empty() {
        return samples.to_vec();
    }

    let noise_floor = percentile(&psd, 20.0);
    let gains: Vec<f32> = psd
        .iter()
        .map(|&p| {
            let snr = p / (noise_floor + EPS);
            snr / (snr + 1.0 / strength)
        })
        .collect();

    // Apply the interpolated curve across the full-length spectrum
    let n = samples.len();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    let ifft = planner.plan_fft_inverse(n);

    let mut buffer: Vec<Complex<f32>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    fft.process(&mut buffer);

    for (i, value) in buffer.iter_mut().enumerate() {
        // Negative frequencies mirror the positive half
        let k = i.min(n - i);
        let freq = k as f32 * sample_rate as f32 / n as f32;
        *value *= interpolate_gain(&freqs, &gains, freq);
    }

    ifft.process(&mut buffer);
    let scale = 1.0 / n as f32;
    buffer.iter().map(|c| c.re * scale).collect()
}

/// Linear interpolation of a gain curve sampled at `freqs`
fn interpolate_gain(freqs: &[f32], gains: &[f32], freq: f32) -> f32 {
    match freqs.iter().position(|&f| f >= freq) {
        Some(0) => gains[0],
        Some(idx) => {
            let (f0, f1) = (freqs[idx - 1], freqs[idx]);
            let t = if f1 > f0 { (freq - f0) / (f1 - f0) } else { 0.0 };
            gains[idx - 1] + (gains[idx] - gains[idx - 1]) * t
        }
        None => *gains.last().unwrap_or(&1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::stft::{istft, stft, StftConfig};

    fn tone(freq: f32, sample_rate: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    fn energy(samples: &[f32]) -> f32 {
        samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32
    }

    #[test]
    fn test_subtraction_with_zero_noise_is_identity() {
        let sr = 16000;
        let signal = tone(440.0, sr as f32, 16000);
        let mut spec = stft(&signal, StftConfig::default(), sr);
        let noise = vec![0.0; spec.num_bins()];

        subtract_noise(&mut spec, &noise, SubtractionParams::new(2.0, 0.01));
        let out = istft(&spec);

        let drift = (energy(&out) / energy(&signal) - 1.0).abs();
        assert!(drift < 0.01, "energy drift {}", drift);
    }

    #[test]
    fn test_subtraction_respects_gain_floor() {
        let sr = 16000;
        let signal = tone(440.0, sr as f32, 16000);
        let mut spec = stft(&signal, StftConfig::default(), sr);
        // Noise estimate equal to the signal itself, absurdly strong alpha
        let noise = spec.average_power();

        subtract_noise(&mut spec, &noise, SubtractionParams::residual(5.0, 0.25));
        let out = istft(&spec);

        // Power floor of 25% means at least 25% of the energy survives
        let ratio = energy(&out) / energy(&signal);
        assert!(ratio >= 0.2, "floor violated: {}", ratio);
    }

    #[test]
    fn test_edge_noise_estimate_sees_head_and_tail() {
        let sr = 16000;
        // Noise-only edges, loud tone in the middle
        let mut signal = vec![0.01_f32; 8000];
        signal.extend(tone(440.0, sr as f32, 32000));
        signal.extend(vec![0.01_f32; 8000]);

        let spec = stft(&signal, StftConfig::default(), sr);
        let noise = edge_noise_power(&spec, 0.5);

        // The tone bin must not dominate the edge estimate
        let tone_bin = (440.0 / (sr as f32 / spec.config.fft_size as f32)).round() as usize;
        let avg = spec.average_power();
        assert!(noise[tone_bin] < avg[tone_bin] * 0.5);
    }

    #[test]
    fn test_welch_psd_peak_at_tone() {
        let sr = 16000;
        let signal = tone(1000.0, sr as f32, 16000);
        let (freqs, psd) = welch_psd(&signal, sr, 2048);

        let peak = psd
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| freqs[i])
            .unwrap();
        assert!((peak - 1000.0).abs() < 20.0, "peak at {}", peak);
    }

    #[test]
    fn test_wiener_keeps_dominant_tone() {
        let sr = 16000;
        let signal = tone(500.0, sr as f32, 16000);
        let out = wiener_filter(&signal, sr, 0.8);

        let ratio = energy(&out) / energy(&signal);
        assert!(ratio > 0.8, "dominant tone lost: {}", ratio);
    }

    #[test]
    fn test_wiener_zero_strength_passthrough() {
        let signal = tone(500.0, 16000.0, 4000);
        let out = wiener_filter(&signal, 16000, 0.0);
        assert_eq!(out, signal);
    }
}
