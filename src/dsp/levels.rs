//! Level and energy analysis helpers

use crate::engine::buffer::{db_to_linear, AudioBuffer};

/// Mean squared sample value
pub fn energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64) as f32
}

/// Root-mean-square level (linear)
pub fn rms(samples: &[f32]) -> f32 {
    energy(samples).sqrt()
}

/// Absolute peak level (linear)
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

/// Total energy of a whole buffer across channels (mean square)
pub fn buffer_energy(buffer: &AudioBuffer) -> f32 {
    let total = buffer.channels() * buffer.len();
    if total == 0 {
        return 0.0;
    }
    let sum: f64 = buffer
        .samples
        .iter()
        .flat_map(|ch| ch.iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();
    (sum / total as f64) as f32
}

/// Percentile of a set of values, by linear interpolation between ranks
///
/// `p` is in percent (0-100). Returns 0.0 for an empty slice.
pub fn percentile(values: &[f32], p: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f32> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Pearson correlation between two equal-length channels
///
/// Returns 0.0 for degenerate inputs (mismatched length, too short, or a
/// constant channel) rather than NaN.
pub fn correlation(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.len() < 2 {
        return 0.0;
    }
    let n = a.len() as f64;
    let mean_a: f64 = a.iter().map(|&x| x as f64).sum::<f64>() / n;
    let mean_b: f64 = b.iter().map(|&x| x as f64).sum::<f64>() / n;

    let mut cov = 0.0_f64;
    let mut var_a = 0.0_f64;
    let mut var_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        let da = x as f64 - mean_a;
        let db = y as f64 - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < 1e-12 {
        0.0
    } else {
        (cov / denom) as f32
    }
}

/// Normalize a buffer toward a target RMS level with a peak ceiling
///
/// Gain drives the combined-channel RMS toward `target_db`, then is clamped
/// so the post-gain peak never exceeds `peak_ceiling`. Silent buffers are
/// left untouched.
pub fn normalize_rms(buffer: &mut AudioBuffer, target_db: f32, peak_ceiling: f32) {
    let current = buffer_energy(buffer).sqrt();
    if current <= 1e-8 {
        return;
    }

    let target = db_to_linear(target_db);
    let mut gain = target / current;

    let current_peak = buffer
        .samples
        .iter()
        .flat_map(|ch| ch.iter())
        .map(|s| s.abs())
        .fold(0.0_f32, f32::max);
    if current_peak * gain > peak_ceiling {
        gain = peak_ceiling / current_peak;
    }

    for channel in &mut buffer.samples {
        for sample in channel.iter_mut() {
            *sample *= gain;
        }
    }
}
