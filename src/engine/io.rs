//! Audio file I/O for Stemsep
//!
//! Handles importing and exporting WAV files via hound. Imported audio keeps
//! its source sample rate; the pipeline resamples per quality tier itself.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::engine::buffer::{AudioBuffer, ChannelLayout};
use crate::error::{Result, StemsepError};

/// Import a WAV file into an [`AudioBuffer`]
///
/// Samples are converted to 32-bit float. Only mono and stereo files are
/// accepted; anything wider is rejected at the boundary.
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file is not a valid WAV file
/// * `UnsupportedFormat` - If the audio has more than 2 channels
/// * `EmptyAudio` - If the file holds no samples
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(StemsepError::FileNotFound {
            path: path.display().to_string(),
            source: None,
        });
    }

    let reader = WavReader::open(path).map_err(|e| StemsepError::InvalidAudio {
        reason: format!("Failed to open WAV file: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;

    if channels > 2 {
        return Err(StemsepError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", channels),
        });
    }

    let samples_f32 = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    if samples_f32.is_empty() {
        return Err(StemsepError::EmptyAudio);
    }

    let layout = if channels == 1 {
        ChannelLayout::Mono
    } else {
        ChannelLayout::Stereo
    };

    AudioBuffer::from_interleaved(&samples_f32, layout, spec.sample_rate)
}

/// Export an [`AudioBuffer`] to a 16-bit WAV file at its own sample rate
pub fn export_audio(buffer: &AudioBuffer, path: &Path) -> Result<()> {
    if buffer.is_empty() {
        return Err(StemsepError::EmptyAudio);
    }

    let spec = WavSpec {
        channels: buffer.channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(wav_io_error)?;

    for sample in buffer.to_interleaved() {
        let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer.write_sample(scaled).map_err(wav_io_error)?;
    }

    writer.finalize().map_err(wav_io_error)?;
    Ok(())
}

fn wav_io_error(e: hound::Error) -> StemsepError {
    StemsepError::Io(std::io::Error::other(e.to_string()))
}

/// Read all samples from a WAV reader, converting to f32 in [-1, 1]
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let invalid = |e: hound::Error| StemsepError::InvalidAudio {
        reason: format!("Failed to read samples: {}", e),
        source: Some(Box::new(e)),
    };

    match (sample_format, bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map_err(invalid))
            .collect(),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0).map_err(invalid))
            .collect(),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0).map_err(invalid))
            .collect(),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2147483648.0).map_err(invalid))
            .collect(),
        (format, bits) => Err(StemsepError::UnsupportedFormat {
            format: format!("{}-bit {:?} WAV", bits, format),
        }),
    }
}
