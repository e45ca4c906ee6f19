//! Biquad filter primitives
//!
//! RBJ Audio EQ Cookbook biquads used across the pipeline: pass filters for
//! band splitting and rumble/high-cut stages, notches for hum removal, peaks
//! for formant shaping. Filtering is offered both single-pass and zero-phase
//! (forward-backward), the latter so filter stages do not smear transients
//! with phase distortion.
//!
//! Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html

use std::f64::consts::PI;

/// Filter response type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Remove above frequency
    LowPass,
    /// Remove below frequency
    HighPass,
    /// Keep a band around frequency (constant 0 dB peak gain)
    BandPass,
    /// Remove a narrow band around frequency
    Notch,
    /// Bell curve boost/cut
    Peak,
}

/// Biquad filter coefficients
///
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2),
/// normalized by a0.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Calculate cookbook coefficients for the given response
    ///
    /// `gain_db` only affects `Peak`. Frequency is clamped below Nyquist and
    /// Q to a sane range, so degenerate parameters produce a tame filter
    /// rather than an unstable one.
    pub fn new(
        filter_type: FilterType,
        sample_rate: f64,
        frequency: f64,
        q: f64,
        gain_db: f64,
    ) -> Self {
        let freq = frequency.clamp(1.0, sample_rate / 2.0 - 1.0);
        let q = q.clamp(0.1, 50.0);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::LowPass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::HighPass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::BandPass => (
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::Notch => (
                1.0,
                -2.0 * cos_w0,
                1.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::Peak => {
                let a = (10.0_f64).powf(gain_db / 40.0);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
        };

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Low-pass section at `frequency` Hz
    pub fn low_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        Self::new(FilterType::LowPass, sample_rate, frequency, q, 0.0)
    }

    /// High-pass section at `frequency` Hz
    pub fn high_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        Self::new(FilterType::HighPass, sample_rate, frequency, q, 0.0)
    }

    /// Band-pass section centered on `frequency` Hz
    pub fn band_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        Self::new(FilterType::BandPass, sample_rate, frequency, q, 0.0)
    }

    /// Notch section centered on `frequency` Hz
    pub fn notch(sample_rate: f64, frequency: f64, q: f64) -> Self {
        Self::new(FilterType::Notch, sample_rate, frequency, q, 0.0)
    }

    /// Peaking section at `frequency` Hz with the given boost/cut
    pub fn peak(sample_rate: f64, frequency: f64, q: f64, gain_db: f64) -> Self {
        Self::new(FilterType::Peak, sample_rate, frequency, q, gain_db)
    }
}

/// Biquad filter state for one channel
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    /// Process a single sample (Direct Form I)
    fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// Q values for an even-order Butterworth response built from biquad sections
///
/// The counterpart of designing one Nth-order Butterworth filter: cascading
/// second-order sections with these Q values gives the same maximally-flat
/// magnitude response. Odd orders round up.
pub fn butterworth_qs(order: usize) -> Vec<f64> {
    let sections = order.div_ceil(2).max(1);
    (0..sections)
        .map(|k| {
            let theta = PI * (2.0 * k as f64 + 1.0) / (2.0 * sections as f64 * 2.0);
            1.0 / (2.0 * theta.sin())
        })
        .collect()
}

/// Build a Butterworth-style cascade for the given response and order
pub fn butterworth_cascade(
    filter_type: FilterType,
    sample_rate: f64,
    frequency: f64,
    order: usize,
) -> Vec<BiquadCoeffs> {
    butterworth_qs(order)
        .into_iter()
        .map(|q| BiquadCoeffs::new(filter_type, sample_rate, frequency, q, 0.0))
        .collect()
}

/// Run a cascade over the samples in place, single pass
pub fn filter_in_place(sections: &[BiquadCoeffs], samples: &mut [f32]) {
    for coeffs in sections {
        let mut state = BiquadState::default();
        for sample in samples.iter_mut() {
            *sample = state.process(*sample as f64, coeffs) as f32;
        }
    }
}

/// Run a cascade forward then backward (zero-phase)
///
/// The backward pass cancels the forward pass's phase shift, at the cost of
/// doubling the magnitude response in dB. All pipeline filter stages use
/// this entry point.
pub fn filtfilt(sections: &[BiquadCoeffs], samples: &mut [f32]) {
    filter_in_place(sections, samples);
    samples.reverse();
    filter_in_place(sections, samples);
    samples.reverse();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, sample_rate: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_notch_removes_center_frequency() {
        let sr = 8000.0;
        let mut hum = tone(60.0, sr, 8000);
        let before = rms(&hum);

        filtfilt(&[BiquadCoeffs::notch(sr as f64, 60.0, 10.0)], &mut hum);

        // Judge the steady-state middle; the edges carry filter ring-in
        let middle = rms(&hum[2000..6000]);
        assert!(middle < before * 0.05, "notch left {} of {}", middle, before);
    }

    #[test]
    fn test_notch_passes_distant_frequency() {
        let sr = 8000.0;
        let mut music = tone(1000.0, sr, 8000);
        let before = rms(&music);

        filtfilt(&[BiquadCoeffs::notch(sr as f64, 60.0, 10.0)], &mut music);

        assert!((rms(&music) - before).abs() < before * 0.05);
    }

    #[test]
    fn test_low_pass_attenuates_high_band() {
        let sr = 16000.0;
        let mut high = tone(6000.0, sr, 16000);
        let mut low = tone(200.0, sr, 16000);
        let cascade = butterworth_cascade(FilterType::LowPass, sr as f64, 1000.0, 4);

        filtfilt(&cascade, &mut high);
        filtfilt(&cascade, &mut low);

        assert!(rms(&high) < 0.01, "stopband rms {}", rms(&high));
        assert!(rms(&low) > 0.6, "passband rms {}", rms(&low));
    }

    #[test]
    fn test_high_pass_attenuates_rumble() {
        let sr = 16000.0;
        let mut rumble = tone(25.0, sr, 32000);
        let cascade = butterworth_cascade(FilterType::HighPass, sr as f64, 60.0, 4);
        let before = rms(&rumble);

        filtfilt(&cascade, &mut rumble);

        assert!(rms(&rumble) < before * 0.1);
    }

    #[test]
    fn test_band_pass_selects_band() {
        let sr = 16000.0;
        let mut inside = tone(150.0, sr, 16000);
        let mut outside = tone(3000.0, sr, 16000);
        let section = BiquadCoeffs::band_pass(sr as f64, 150.0, 1.0);

        filtfilt(&[section], &mut inside);
        filtfilt(&[section], &mut outside);

        assert!(rms(&inside) > 0.5);
        assert!(rms(&outside) < 0.05);
    }

    #[test]
    fn test_peak_boost_raises_level() {
        let sr = 16000.0;
        let mut band = tone(500.0, sr, 16000);
        let before = rms(&band);

        filtfilt(&[BiquadCoeffs::peak(sr as f64, 500.0, 1.4, 3.0)], &mut band);

        // +3 dB applied twice by the zero-phase pass
        let gained = rms(&band) / before;
        assert!(gained > 1.8 && gained < 2.2, "gain {}", gained);
    }

    #[test]
    fn test_butterworth_q_sections() {
        assert_eq!(butterworth_qs(2).len(), 1);
        assert_eq!(butterworth_qs(4).len(), 2);
        assert_eq!(butterworth_qs(6).len(), 3);
        // Second-order Butterworth is Q = 1/sqrt(2)
        assert!((butterworth_qs(2)[0] - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn test_filtfilt_preserves_length() {
        let mut samples = tone(440.0, 16000.0, 1234);
        filtfilt(
            &butterworth_cascade(FilterType::LowPass, 16000.0, 2000.0, 6),
            &mut samples,
        );
        assert_eq!(samples.len(), 1234);
    }
}
