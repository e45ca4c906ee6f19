//! Integration Tests
//!
//! End-to-end properties of the separation and noise-removal pipeline.

use stemsep::denoise::{classify, NoiseRemover, NoiseType};
use stemsep::dsp::levels::correlation;
use stemsep::engine::buffer::{AudioBuffer, ChannelLayout};
use stemsep::separate::{midside, Backend, ChannelSeparator, Quality, SeparationMode};

/// Helper to create a sine wave
fn sine(freq: f32, sample_rate: u32, num_samples: usize, amplitude: f32) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            amplitude
                * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
        })
        .collect()
}

/// Deterministic zero-mean pseudo-noise
fn pseudo_noise(num_samples: usize, seed: u64, amplitude: f32) -> Vec<f32> {
    let mut state = seed.max(1);
    (0..num_samples)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (((state >> 32) as f32 / (1u64 << 31) as f32) - 1.0) * amplitude
        })
        .collect()
}

/// Signal energy at one frequency via projection onto a complex exponential
fn energy_at(samples: &[f32], sample_rate: u32, freq: f32) -> f32 {
    let w = 2.0 * std::f32::consts::PI * freq / sample_rate as f32;
    let (mut re, mut im) = (0.0_f32, 0.0_f32);
    for (i, &s) in samples.iter().enumerate() {
        re += s * (w * i as f32).cos();
        im += s * (w * i as f32).sin();
    }
    (re * re + im * im) / samples.len() as f32
}

fn total_energy(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32
}

// === Separation properties ===

#[test]
fn test_separation_preserves_sample_count() {
    let separator = ChannelSeparator::without_model();
    let sr = 44_100;
    let left = sine(440.0, sr, sr as usize, 0.4);
    let right = sine(330.0, sr, sr as usize, 0.4);
    let input = AudioBuffer::from_stereo(left, right, sr).unwrap();

    for mode in [
        SeparationMode::Fallback,
        SeparationMode::Clean,
        SeparationMode::Enhanced,
    ] {
        let result = separator
            .separate(&input, mode, Quality::High, Backend::Auto)
            .unwrap();
        // High quality keeps the input rate, so lengths match exactly
        assert_eq!(result.vocals.len(), input.len(), "{:?}", mode);
        assert_eq!(result.accompaniment.len(), input.len(), "{:?}", mode);
    }
}

#[test]
fn test_mid_side_decomposition_is_invertible() {
    let sr = 44_100;
    let left = sine(440.0, sr, 4410, 0.4);
    let right = sine(617.0, sr, 4410, 0.3);

    let (mid, side) = midside::split(&left, &right);
    let (l2, r2) = midside::join(&mid, &side);

    for i in 0..left.len() {
        assert!((left[i] - l2[i]).abs() < 1e-6, "L mismatch at {}", i);
        assert!((right[i] - r2[i]).abs() < 1e-6, "R mismatch at {}", i);
    }
}

#[test]
fn test_mono_without_model_fails_with_unseparable_input() {
    let separator = ChannelSeparator::without_model();
    let mono = AudioBuffer::from_mono(sine(440.0, 44_100, 44_100, 0.4), 44_100);

    let err = separator
        .separate(&mono, SeparationMode::Clean, Quality::High, Backend::Auto)
        .unwrap_err();
    assert_eq!(err.error_code(), "UNSEPARABLE_INPUT");
}

#[test]
fn test_empty_waveform_is_rejected_not_crashed() {
    let separator = ChannelSeparator::without_model();
    let empty = AudioBuffer::new(0, ChannelLayout::Stereo, 44_100);

    let err = separator
        .separate(&empty, SeparationMode::Clean, Quality::High, Backend::Auto)
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_PARAMETER");

    let remover = NoiseRemover::new();
    let err = remover
        .remove_noise(
            &AudioBuffer::new(0, ChannelLayout::Mono, 44_100),
            NoiseType::Auto,
            0.5,
        )
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_PARAMETER");
}

#[test]
fn test_centered_vocal_scenario() {
    // A centered "vocal" (identical sine on L/R) plus independent noise per
    // channel: the vocal stem should track the sine, the accompaniment stem
    // should be dominated by the injected noise.
    let sr = 44_100;
    let n = sr as usize * 2;
    let vocal = sine(440.0, sr, n, 0.5);
    let noise_l = pseudo_noise(n, 7, 0.1);
    let noise_r = pseudo_noise(n, 8, 0.1);

    let left: Vec<f32> = vocal.iter().zip(&noise_l).map(|(&v, &n)| v + n).collect();
    let right: Vec<f32> = vocal.iter().zip(&noise_r).map(|(&v, &n)| v + n).collect();
    let input = AudioBuffer::from_stereo(left, right, sr).unwrap();

    let separator = ChannelSeparator::without_model();
    let result = separator
        .separate(&input, SeparationMode::Fallback, Quality::High, Backend::Auto)
        .unwrap();

    let vocal_corr = correlation(result.vocals.channel(0), &vocal);
    assert!(vocal_corr > 0.9, "vocal correlation {}", vocal_corr);

    // Accompaniment energy is concentrated away from the vocal tone
    let acc = result.accompaniment.channel(0);
    let tonal = energy_at(acc, sr, 440.0);
    let total = total_energy(acc);
    assert!(total > 0.0);
    assert!(
        tonal < total * 0.2,
        "accompaniment carries vocal tone: {} of {}",
        tonal,
        total
    );
}

#[test]
fn test_quality_tier_sets_output_rate() {
    let separator = ChannelSeparator::without_model();
    let sr = 44_100;
    let input = AudioBuffer::from_stereo(
        sine(440.0, sr, sr as usize, 0.4),
        sine(330.0, sr, sr as usize, 0.4),
        sr,
    )
    .unwrap();

    for (quality, expected) in [
        (Quality::High, 44_100),
        (Quality::Medium, 22_050),
        (Quality::Low, 16_000),
    ] {
        let result = separator
            .separate(&input, SeparationMode::Clean, quality, Backend::Auto)
            .unwrap();
        assert_eq!(result.sample_rate, expected);
        assert_eq!(result.vocals.sample_rate, result.accompaniment.sample_rate);
    }
}

// === Noise removal properties ===

#[test]
fn test_classification_is_idempotent() {
    let signal = pseudo_noise(32_000, 42, 0.3);
    let first = classify(&signal, 16_000).class;
    let second = classify(&signal, 16_000).class;
    assert_eq!(first, second);
}

#[test]
fn test_strength_monotonicity_on_white_noise() {
    let remover = NoiseRemover::new();
    let noise = AudioBuffer::from_mono(pseudo_noise(32_000, 13, 0.3), 16_000);

    let mut previous = f32::NEG_INFINITY;
    for strength in [0.0, 0.25, 0.5, 0.75, 1.0] {
        let cleaned = remover
            .remove_noise(&noise, NoiseType::Auto, strength)
            .unwrap();
        assert!(
            cleaned.noise_reduction_db >= previous - 1e-3,
            "reduction decreased at strength {}: {} -> {}",
            strength,
            previous,
            cleaned.noise_reduction_db
        );
        previous = cleaned.noise_reduction_db;
    }
}

#[test]
fn test_hum_removal_is_frequency_selective() {
    // 60 Hz hum plus 1 kHz content: full-strength hum removal must pull the
    // hum down at least 10 dB while losing less than 1 dB at 1 kHz.
    let sr = 44_100;
    let n = sr as usize * 3;
    let mixed: Vec<f32> = sine(60.0, sr, n, 0.4)
        .iter()
        .zip(&sine(1000.0, sr, n, 0.4))
        .map(|(&h, &m)| h + m)
        .collect();
    let input = AudioBuffer::from_mono(mixed.clone(), sr);

    let remover = NoiseRemover::new();
    let cleaned = remover.remove_noise(&input, NoiseType::Hum, 1.0).unwrap();

    let hum_before = energy_at(&mixed, sr, 60.0);
    let hum_after = energy_at(cleaned.audio.channel(0), sr, 60.0);
    let hum_drop_db = 10.0 * (hum_before / hum_after.max(1e-12)).log10();
    assert!(hum_drop_db >= 10.0, "hum only dropped {:.1} dB", hum_drop_db);

    let music_before = energy_at(&mixed, sr, 1000.0);
    let music_after = energy_at(cleaned.audio.channel(0), sr, 1000.0);
    let music_drop_db = 10.0 * (music_before / music_after.max(1e-12)).log10();
    assert!(
        music_drop_db < 1.0,
        "1 kHz content dropped {:.1} dB",
        music_drop_db
    );
}

#[test]
fn test_artifact_cleanup_reports_partial_success() {
    let remover = NoiseRemover::new();
    let vocals = AudioBuffer::from_mono(pseudo_noise(16_000, 5, 0.2), 16_000);
    // Zero-length accompaniment forces that stem's cleanup to fail
    let broken = AudioBuffer::new(0, ChannelLayout::Mono, 16_000);

    let report = remover.remove_separation_artifacts(&vocals, &broken, 0.8);

    assert!(!report.success);
    assert!(report.vocals.is_ok(), "good stem was discarded");
    assert!(report.accompaniment.is_err());
    assert!(report.average_reduction_db.is_some());
}

// === Full pipeline ===

#[test]
fn test_separate_then_clean_pipeline() {
    let sr = 22_050;
    let n = sr as usize * 2;
    let vocal = sine(220.0, sr, n, 0.4);
    let left: Vec<f32> = vocal
        .iter()
        .zip(&pseudo_noise(n, 17, 0.15))
        .map(|(&v, &x)| v + x)
        .collect();
    let right: Vec<f32> = vocal
        .iter()
        .zip(&pseudo_noise(n, 18, 0.15))
        .map(|(&v, &x)| v + x)
        .collect();
    let input = AudioBuffer::from_stereo(left, right, sr).unwrap();

    let separator = ChannelSeparator::without_model();
    let separated = separator
        .separate(&input, SeparationMode::Clean, Quality::Medium, Backend::Auto)
        .unwrap();

    let remover = NoiseRemover::new();
    let report = remover.remove_separation_artifacts(
        &separated.vocals,
        &separated.accompaniment,
        0.8,
    );

    assert!(report.success);
    let cleaned_vocals = report.vocals.unwrap();
    let cleaned_accompaniment = report.accompaniment.unwrap();
    assert_eq!(cleaned_vocals.audio.len(), separated.vocals.len());
    assert_eq!(
        cleaned_accompaniment.audio.len(),
        separated.accompaniment.len()
    );
    assert!(cleaned_vocals.audio.is_finite());
    assert!(cleaned_accompaniment.audio.is_finite());
}

#[test]
fn test_enhanced_mode_end_to_end() {
    let sr = 22_050;
    let n = sr as usize * 2;
    let left: Vec<f32> = sine(220.0, sr, n, 0.4)
        .iter()
        .zip(&sine(1500.0, sr, n, 0.25))
        .map(|(&v, &i)| v + i)
        .collect();
    let right: Vec<f32> = sine(220.0, sr, n, 0.4)
        .iter()
        .zip(&sine(700.0, sr, n, 0.25))
        .map(|(&v, &i)| v - i)
        .collect();
    let input = AudioBuffer::from_stereo(left, right, sr).unwrap();

    let separator = ChannelSeparator::without_model();
    let result = separator
        .separate(&input, SeparationMode::Enhanced, Quality::Medium, Backend::Auto)
        .unwrap();

    assert_eq!(result.method, "mid_side");
    assert_eq!(result.vocals.len(), result.accompaniment.len());
    assert!(result.vocals.is_finite());
    assert!(result.accompaniment.is_finite());
    // Peaks stay inside the clip-protection ceiling
    let peak = result
        .vocals
        .channel(0)
        .iter()
        .chain(result.accompaniment.channel(0))
        .map(|s| s.abs())
        .fold(0.0_f32, f32::max);
    assert!(peak <= 0.96, "peak {}", peak);
}
