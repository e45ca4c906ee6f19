//! Separation model boundary
//!
//! The neural two-stem separator is an optional external collaborator. The
//! pipeline consumes it through [`SeparationModel`] and ships a null-object
//! implementation for the common case where no model is installed, so no
//! pipeline code ever branches on a nullable model reference.

use crate::error::{Result, StemsepError};

/// Output of one model invocation: equal-length mono stems
#[derive(Debug, Clone)]
pub struct ModelStems {
    pub vocals: Vec<f32>,
    pub accompaniment: Vec<f32>,
}

/// Contract for an external two-stem separation model
///
/// A model operates at one fixed sample rate chosen when it is loaded
/// (16 kHz for the standard variant, 44.1 kHz for the high-quality one).
/// Implementations are not assumed re-entrant; callers that share one
/// instance across threads must serialize access themselves.
pub trait SeparationModel: Send + Sync {
    /// Whether the model loaded and can take work
    ///
    /// Reflects only model state, never overall service usability: the
    /// mid/side path works without any model.
    fn is_available(&self) -> bool;

    /// The fixed processing rate chosen at load time
    fn sample_rate(&self) -> u32;

    /// Short identifier for result metadata
    fn name(&self) -> &'static str;

    /// Split a stereo waveform into vocal and accompaniment stems
    ///
    /// Channels must be equal length and already at this model's fixed
    /// rate. Mono sources are duplicated into a synthetic stereo pair by the
    /// caller; the model contract tolerates identical channels.
    fn separate(&self, left: &[f32], right: &[f32]) -> Result<ModelStems>;
}

/// Stand-in for "no model installed"
///
/// Never available; calling `separate` is a contract violation and reports
/// `ModelUnavailable`.
#[derive(Debug, Default)]
pub struct NullModel;

impl SeparationModel for NullModel {
    fn is_available(&self) -> bool {
        false
    }

    fn sample_rate(&self) -> u32 {
        16_000
    }

    fn name(&self) -> &'static str {
        "none"
    }

    fn separate(&self, _left: &[f32], _right: &[f32]) -> Result<ModelStems> {
        Err(StemsepError::ModelUnavailable {
            detail: "no separation model is loaded".to_string(),
        })
    }
}
