//! Audio Buffer Management
//!
//! Provides the core audio buffer type shared by every pipeline stage.
//! Audio is stored planar (one Vec per channel) as 32-bit float; interleaved
//! data is converted at the I/O boundary. Amplitude is expected in [-1, 1]
//! after normalization steps.

use crate::error::{Result, StemsepError};

// ============================================================================
// Constants
// ============================================================================

/// Peak ceiling applied when normalizing stems (clip protection)
pub const PEAK_CEILING: f32 = 0.95;

/// Target RMS reference level for per-stem normalization, in dBFS
pub const TARGET_RMS_DB: f32 = -23.0;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns `f32::NEG_INFINITY` for zero or negative input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    Mono,
    /// Two channels (stereo: left, right)
    #[default]
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Core audio buffer type for all processing in Stemsep
///
/// Stores audio as non-interleaved 32-bit floating point samples. Each
/// channel is a separate `Vec<f32>`; all channels have equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer with the given length and layout
    pub fn new(num_samples: usize, layout: ChannelLayout, sample_rate: u32) -> Self {
        let samples = vec![vec![0.0_f32; num_samples]; layout.num_channels()];
        Self {
            samples,
            sample_rate,
        }
    }

    /// Create a mono buffer from a single channel of samples
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: vec![samples],
            sample_rate,
        }
    }

    /// Create a stereo buffer from separate left/right channels
    ///
    /// Returns `InvalidAudio` if the channels differ in length.
    pub fn from_stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if left.len() != right.len() {
            return Err(StemsepError::InvalidAudio {
                reason: format!(
                    "channel length mismatch: left={}, right={}",
                    left.len(),
                    right.len()
                ),
                source: None,
            });
        }
        Ok(Self {
            samples: vec![left, right],
            sample_rate,
        })
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Arguments
    /// * `interleaved` - Interleaved sample data (L, R, L, R, ... for stereo)
    /// * `layout` - Channel configuration
    /// * `sample_rate` - Sample rate in Hz
    pub fn from_interleaved(
        interleaved: &[f32],
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Result<Self> {
        let num_channels = layout.num_channels();
        if interleaved.len() % num_channels != 0 {
            return Err(StemsepError::InvalidAudio {
                reason: format!(
                    "sample count {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
                source: None,
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];
        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Flatten to interleaved sample data for export
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.channels();
        let num_samples = self.len();
        let mut out = Vec::with_capacity(num_channels * num_samples);
        for frame in 0..num_samples {
            for ch in 0..num_channels {
                out.push(self.samples[ch][frame]);
            }
        }
        out
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Channel layout, if the channel count maps to one
    pub fn layout(&self) -> Option<ChannelLayout> {
        ChannelLayout::from_count(self.channels())
    }

    /// Number of samples per channel
    pub fn len(&self) -> usize {
        self.samples.first().map_or(0, |ch| ch.len())
    }

    /// True when the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Borrow one channel's samples
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Mutably borrow one channel's samples
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Check that every sample is finite (no NaN/Inf)
    pub fn is_finite(&self) -> bool {
        self.samples
            .iter()
            .flat_map(|channel| channel.iter())
            .all(|s| s.is_finite())
    }

    /// Mix all channels down to a single mono channel
    pub fn to_mono(&self) -> AudioBuffer {
        if self.channels() <= 1 {
            return self.clone();
        }
        let num_channels = self.channels() as f32;
        let mixed = (0..self.len())
            .map(|i| {
                self.samples.iter().map(|ch| ch[i]).sum::<f32>() / num_channels
            })
            .collect();
        AudioBuffer::from_mono(mixed, self.sample_rate)
    }

    /// Resample to a new rate using linear interpolation
    ///
    /// Returns a clone when the target rate already matches. Linear
    /// interpolation is sufficient here: the pipeline only downsamples to
    /// quality-tier rates before heavy spectral processing.
    pub fn resample(&self, target_rate: u32) -> AudioBuffer {
        if target_rate == self.sample_rate || self.is_empty() {
            let mut out = self.clone();
            out.sample_rate = target_rate;
            return out;
        }

        let ratio = self.sample_rate as f64 / target_rate as f64;
        let target_len = ((self.len() as f64) / ratio).round() as usize;
        let target_len = target_len.max(1);

        let samples = self
            .samples
            .iter()
            .map(|channel| resample_channel(channel, ratio, target_len))
            .collect();

        AudioBuffer {
            samples,
            sample_rate: target_rate,
        }
    }
}

fn resample_channel(channel: &[f32], ratio: f64, target_len: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(target_len);
    for i in 0..target_len {
        let pos = i as f64 * ratio;
        let idx = pos.floor() as usize;
        let frac = (pos - idx as f64) as f32;
        let a = channel.get(idx).copied().unwrap_or(0.0);
        let b = channel.get(idx + 1).copied().unwrap_or(a);
        out.push(a + (b - a) * frac);
    }
    out
}

// ============================================================================
// Buffer Analysis
// ============================================================================

/// Calculate the RMS level of an audio buffer in dB
///
/// Returns `f32::NEG_INFINITY` for empty or silent buffers.
pub fn calculate_rms(buffer: &AudioBuffer) -> f32 {
    let total_samples = buffer.channels() * buffer.len();
    if total_samples == 0 {
        return f32::NEG_INFINITY;
    }

    let sum_squares: f64 = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();

    let rms = (sum_squares / total_samples as f64).sqrt() as f32;
    linear_to_db(rms)
}

/// Calculate the peak level of an audio buffer in dB
pub fn calculate_peak(buffer: &AudioBuffer) -> f32 {
    let peak = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| s.abs())
        .fold(0.0_f32, f32::max);

    linear_to_db(peak)
}
