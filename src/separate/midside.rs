//! Mid/side decomposition
//!
//! The first-pass split rests on one assumption: the lead vocal is panned
//! center, so it survives in the sum (mid) channel and cancels in the
//! difference (side) channel, while off-center instruments survive in the
//! side. Off-center vocals and mono-collapsed mixes degrade the split; that
//! is a known limitation of the method, not a defect, and no attempt is made
//! to detect or correct it.

use crate::dsp::biquad::{butterworth_cascade, filtfilt, FilterType};
use crate::dsp::levels::correlation;

/// L/R correlation above which content is treated as genuinely centered
pub const CENTER_CORRELATION_THRESHOLD: f32 = 0.7;

/// Cutoff for the low-frequency component fed back into the side stem
const BASS_RETENTION_CUTOFF_HZ: f64 = 150.0;

/// How much of the low-passed mid is mixed back into the side stem
const BASS_RETENTION_GAIN: f32 = 0.6;

/// Split stereo channels into `(mid, side)`
///
/// `mid = (L+R)/2` is the vocal-dominant proxy, `side = (L-R)/2` the
/// accompaniment-dominant proxy. The decomposition is exactly invertible:
/// `L = mid + side`, `R = mid - side`.
pub fn split(left: &[f32], right: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let n = left.len().min(right.len());
    let mut mid = Vec::with_capacity(n);
    let mut side = Vec::with_capacity(n);
    for i in 0..n {
        mid.push((left[i] + right[i]) / 2.0);
        side.push((left[i] - right[i]) / 2.0);
    }
    (mid, side)
}

/// Recompose `(left, right)` from mid and side signals
pub fn join(mid: &[f32], side: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let n = mid.len().min(side.len());
    let mut left = Vec::with_capacity(n);
    let mut right = Vec::with_capacity(n);
    for i in 0..n {
        left.push(mid[i] + side[i]);
        right.push(mid[i] - side[i]);
    }
    (left, right)
}

/// Center refinement for the vocal stem (high quality tier)
///
/// When L and R correlate strongly the mix really does carry centered
/// content, so the mid estimate is blended toward `(L+R)/4` with a weight
/// proportional to the correlation. Below the threshold the plain mid is
/// returned unchanged.
pub fn enhance_center(left: &[f32], right: &[f32], mid: &[f32]) -> Vec<f32> {
    let corr = correlation(left, right);
    if corr <= CENTER_CORRELATION_THRESHOLD {
        return mid.to_vec();
    }

    let weight = (corr * 0.5).clamp(0.0, 0.5);
    mid.iter()
        .zip(left.iter().zip(right))
        .map(|(&m, (&l, &r))| (1.0 - weight) * m + weight * (l + r) / 4.0)
        .collect()
}

/// Side refinement for the accompaniment stem (high quality tier)
///
/// Bass instruments are usually center-panned yet belong in the
/// accompaniment, so a low-passed component of the mid signal is mixed back
/// into the side stem.
pub fn enhance_side(side: &[f32], mid: &[f32], sample_rate: u32) -> Vec<f32> {
    let mut bass: Vec<f32> = mid.to_vec();
    let cascade = butterworth_cascade(
        FilterType::LowPass,
        sample_rate as f64,
        BASS_RETENTION_CUTOFF_HZ,
        4,
    );
    filtfilt(&cascade, &mut bass);

    side.iter()
        .zip(&bass)
        .map(|(&s, &b)| s + BASS_RETENTION_GAIN * b)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tone(freq: f32, sample_rate: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_split_is_invertible() {
        let left = tone(440.0, 44100.0, 1000);
        let right = tone(330.0, 44100.0, 1000);

        let (mid, side) = split(&left, &right);
        let (l2, r2) = join(&mid, &side);

        for i in 0..1000 {
            assert_relative_eq!(left[i], l2[i], epsilon = 1e-6);
            assert_relative_eq!(right[i], r2[i], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_centered_content_lands_in_mid() {
        let vocal = tone(220.0, 44100.0, 1000);
        let (mid, side) = split(&vocal, &vocal);

        for i in 0..1000 {
            assert_relative_eq!(mid[i], vocal[i], epsilon = 1e-6);
            assert_relative_eq!(side[i], 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_enhance_center_below_threshold_is_identity() {
        // Uncorrelated channels: different frequencies
        let left = tone(440.0, 44100.0, 4410);
        let right = tone(617.0, 44100.0, 4410);
        let (mid, _) = split(&left, &right);

        let refined = enhance_center(&left, &right, &mid);
        assert_eq!(refined, mid);
    }

    #[test]
    fn test_enhance_center_blends_on_correlated_input() {
        let vocal = tone(220.0, 44100.0, 4410);
        let (mid, _) = split(&vocal, &vocal);

        let refined = enhance_center(&vocal, &vocal, &mid);
        // Perfect correlation: blend is 0.5*mid + 0.5*(L+R)/4 = 0.75*mid
        for (r, m) in refined.iter().zip(&mid) {
            assert_relative_eq!(*r, 0.75 * m, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_enhance_side_retains_bass() {
        let sr = 44100;
        let bass = tone(60.0, sr as f32, 44100);
        let side = vec![0.0_f32; 44100];

        let refined = enhance_side(&side, &bass, sr);

        let energy: f32 = refined.iter().map(|s| s * s).sum::<f32>() / refined.len() as f32;
        // The 60 Hz component passes the 150 Hz retention filter nearly intact
        assert!(energy > 0.1, "bass missing from side: {}", energy);
    }

    #[test]
    fn test_enhance_side_excludes_vocal_range() {
        let sr = 44100;
        let vocal = tone(1000.0, sr as f32, 44100);
        let side = vec![0.0_f32; 44100];

        let refined = enhance_side(&side, &vocal, sr);

        let energy: f32 = refined.iter().map(|s| s * s).sum::<f32>() / refined.len() as f32;
        assert!(energy < 1e-4, "vocal leaked into side: {}", energy);
    }
}
