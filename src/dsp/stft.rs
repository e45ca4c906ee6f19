//! Short-time spectral transform
//!
//! Hann-windowed STFT with weighted overlap-add reconstruction (analysis and
//! synthesis windows, normalized by the accumulated squared window). The
//! synthesis window smooths frame-boundary discontinuities introduced by
//! spectral modification, which keeps subtraction-style processing from
//! producing frame-edge clicks.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Framing parameters for the transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StftConfig {
    /// Frame length in samples (FFT size)
    pub fft_size: usize,
    /// Step between consecutive frames
    pub hop_size: usize,
}

impl Default for StftConfig {
    /// 2048-sample frames with 75% overlap, the analysis framing used by the
    /// subtraction stages
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_size: 512,
        }
    }
}

impl StftConfig {
    pub fn new(fft_size: usize, hop_size: usize) -> Self {
        Self { fft_size, hop_size }
    }

    /// Shorter frames for gating stages that need finer time resolution
    pub fn gating() -> Self {
        Self {
            fft_size: 1024,
            hop_size: 256,
        }
    }

    /// Number of positive-frequency bins (DC through Nyquist)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }
}

/// Complex spectrogram of one channel
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Frames of positive-frequency bins: `frames[frame][bin]`
    pub frames: Vec<Vec<Complex<f32>>>,
    /// Framing used to produce this spectrogram
    pub config: StftConfig,
    /// Original signal length, for exact-length reconstruction
    pub num_samples: usize,
    /// Sample rate of the source signal
    pub sample_rate: u32,
}

impl Spectrogram {
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_bins(&self) -> usize {
        self.config.num_bins()
    }

    /// Center frequency of a bin in Hz
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.config.fft_size as f32
    }

    /// Mean power per bin across all frames
    pub fn average_power(&self) -> Vec<f32> {
        let bins = self.num_bins();
        let mut power = vec![0.0_f32; bins];
        if self.frames.is_empty() {
            return power;
        }
        for frame in &self.frames {
            for (bin, value) in frame.iter().enumerate() {
                power[bin] += value.norm_sqr();
            }
        }
        let scale = 1.0 / self.frames.len() as f32;
        for p in &mut power {
            *p *= scale;
        }
        power
    }
}

/// Periodic Hann window
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

/// Forward transform of one channel
///
/// The signal is center-padded by half a frame on each side so edge samples
/// get full window coverage in the overlap-add reconstruction.
pub fn stft(samples: &[f32], config: StftConfig, sample_rate: u32) -> Spectrogram {
    let fft_size = config.fft_size;
    let hop = config.hop_size.max(1);
    let half = fft_size / 2;

    let mut padded = vec![0.0_f32; half];
    padded.extend_from_slice(samples);
    padded.resize(padded.len() + half + hop, 0.0);

    let window = hann_window(fft_size);
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);

    let num_frames = if padded.len() >= fft_size {
        (padded.len() - fft_size) / hop + 1
    } else {
        0
    };

    let mut frames = Vec::with_capacity(num_frames);
    let mut buffer = vec![Complex::new(0.0_f32, 0.0); fft_size];

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop;
        for i in 0..fft_size {
            buffer[i] = Complex::new(padded[start + i] * window[i], 0.0);
        }
        fft.process(&mut buffer);
        frames.push(buffer[..config.num_bins()].to_vec());
    }

    Spectrogram {
        frames,
        config,
        num_samples: samples.len(),
        sample_rate,
    }
}

/// Inverse transform, returning exactly `num_samples` samples
pub fn istft(spec: &Spectrogram) -> Vec<f32> {
    let fft_size = spec.config.fft_size;
    let hop = spec.config.hop_size.max(1);
    let half = fft_size / 2;
    let bins = spec.config.num_bins();

    if spec.frames.is_empty() {
        return vec![0.0; spec.num_samples];
    }

    let window = hann_window(fft_size);
    let mut planner = FftPlanner::new();
    let ifft = planner.plan_fft_inverse(fft_size);

    let output_len = (spec.frames.len() - 1) * hop + fft_size;
    let mut output = vec![0.0_f32; output_len];
    let mut window_sum = vec![0.0_f32; output_len];

    let mut buffer = vec![Complex::new(0.0_f32, 0.0); fft_size];
    let scale = 1.0 / fft_size as f32;

    for (frame_idx, frame) in spec.frames.iter().enumerate() {
        // Rebuild the full spectrum from the positive half (real signal)
        buffer[..bins].copy_from_slice(frame);
        for bin in bins..fft_size {
            buffer[bin] = frame[fft_size - bin].conj();
        }
        ifft.process(&mut buffer);

        let start = frame_idx * hop;
        for i in 0..fft_size {
            let sample = buffer[i].re * scale;
            output[start + i] += sample * window[i];
            window_sum[start + i] += window[i] * window[i];
        }
    }

    // Strip the center padding and normalize by the accumulated window
    let mut result = vec![0.0_f32; spec.num_samples];
    for (i, value) in result.iter_mut().enumerate() {
        let idx = i + half;
        if idx < output.len() && window_sum[idx] > 1e-8 {
            *value = output[idx] / window_sum[idx];
        }
    }
    result
}
