//! Mock separation model
//!
//! Does no real inference: derives deterministic "stems" from the mid and
//! side signals so pipeline tests can exercise the model path (availability,
//! resampling to the model rate, mono duplication) and verify verifiable
//! output without model weights.

use super::model::{ModelStems, SeparationModel};
use crate::error::Result;

/// Deterministic stand-in for a real two-stem model
pub struct MockSeparationModel {
    sample_rate: u32,
}

impl MockSeparationModel {
    /// Standard-rate mock (16 kHz, like the default model variant)
    pub fn new() -> Self {
        Self {
            sample_rate: 16_000,
        }
    }

    /// Mock of the high-quality 44.1 kHz variant
    pub fn high_quality() -> Self {
        Self {
            sample_rate: 44_100,
        }
    }
}

impl Default for MockSeparationModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SeparationModel for MockSeparationModel {
    fn is_available(&self) -> bool {
        true
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn separate(&self, left: &[f32], right: &[f32]) -> Result<ModelStems> {
        let n = left.len().min(right.len());
        let mut vocals = Vec::with_capacity(n);
        let mut accompaniment = Vec::with_capacity(n);
        for i in 0..n {
            vocals.push((left[i] + right[i]) / 2.0);
            accompaniment.push((left[i] - right[i]) / 2.0);
        }
        Ok(ModelStems {
            vocals,
            accompaniment,
        })
    }
}
