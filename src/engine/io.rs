//! Audio file I/O for Bandfade
//!
//! WAV import/export through `hound`. Integer samples are divided by the
//! largest positive value of their format on import and multiplied back on
//! export, so a decoded file can be written out in the exact format it
//! arrived in. No resampling happens here; the sample rate of the file is
//! the sample rate of the buffer.

use std::f64::consts::PI;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::engine::buffer::{AudioBuffer, ChannelLayout};
use crate::error::{FadeError, Result};

// ============================================================================
// Source Format
// ============================================================================

/// Sample encoding of a WAV file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceFormat {
    Int8,
    #[default]
    Int16,
    Int24,
    Int32,
    Float32,
}

impl SourceFormat {
    /// Map a WAV header onto a supported encoding
    pub fn from_spec(spec: &WavSpec) -> Result<Self> {
        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 8) => Ok(SourceFormat::Int8),
            (SampleFormat::Int, 16) => Ok(SourceFormat::Int16),
            (SampleFormat::Int, 24) => Ok(SourceFormat::Int24),
            (SampleFormat::Int, 32) => Ok(SourceFormat::Int32),
            (SampleFormat::Float, 32) => Ok(SourceFormat::Float32),
            (format, bits) => Err(FadeError::UnsupportedFormat {
                format: format!("{}-bit {:?} audio", bits, format),
            }),
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        match self {
            SourceFormat::Int8 => 8,
            SourceFormat::Int16 => 16,
            SourceFormat::Int24 => 24,
            SourceFormat::Int32 | SourceFormat::Float32 => 32,
        }
    }

    /// Largest positive sample value; 1.0 for float
    pub fn full_scale(&self) -> f64 {
        match self {
            SourceFormat::Int8 => i8::MAX as f64,
            SourceFormat::Int16 => i16::MAX as f64,
            SourceFormat::Int24 => 8_388_607.0,
            SourceFormat::Int32 => i32::MAX as f64,
            SourceFormat::Float32 => 1.0,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, SourceFormat::Float32)
    }

    fn wav_spec(&self, channels: u16, sample_rate: u32) -> WavSpec {
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: self.bits_per_sample(),
            sample_format: if self.is_float() {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// A decoded file plus the encoding it came from
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub buffer: AudioBuffer,
    pub source: SourceFormat,
}

// ============================================================================
// Import / Export
// ============================================================================

fn invalid_audio(reason: &str, e: hound::Error) -> FadeError {
    FadeError::InvalidAudio {
        reason: format!("{}: {}", reason, e),
        source: Some(Box::new(e)),
    }
}

/// Import a WAV file as normalized 64-bit samples
///
/// # Errors
/// * `FileNotFound` - the file does not exist
/// * `InvalidAudio` - the file is not a readable WAV file
/// * `UnsupportedFormat` - more than 2 channels or an unsupported bit depth
pub fn import_audio(path: &Path) -> Result<DecodedAudio> {
    if !path.exists() {
        return Err(FadeError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let reader = WavReader::open(path).map_err(|e| invalid_audio("Failed to open WAV file", e))?;
    let spec = reader.spec();
    let layout = ChannelLayout::from_count(spec.channels as usize).ok_or_else(|| {
        FadeError::UnsupportedFormat {
            format: format!(
                "{}-channel audio (only mono/stereo supported)",
                spec.channels
            ),
        }
    })?;
    let source = SourceFormat::from_spec(&spec)?;

    let interleaved = read_samples(reader, source)?;
    let buffer = AudioBuffer::from_interleaved(&interleaved, layout, spec.sample_rate)?;
    debug!(
        "Imported {}: {} samples x {} channels at {} Hz ({:?})",
        path.display(),
        buffer.len(),
        buffer.channels(),
        buffer.sample_rate(),
        source
    );

    Ok(DecodedAudio { buffer, source })
}

fn read_samples<R: std::io::Read>(mut reader: WavReader<R>, source: SourceFormat) -> Result<Vec<f64>> {
    let scale = source.full_scale();
    match source {
        SourceFormat::Float32 => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| invalid_audio("Failed to read float samples", e)),
        SourceFormat::Int8 => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f64 / scale))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| invalid_audio("Failed to read 8-bit samples", e)),
        SourceFormat::Int16 => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f64 / scale))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| invalid_audio("Failed to read 16-bit samples", e)),
        SourceFormat::Int24 | SourceFormat::Int32 => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f64 / scale))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| invalid_audio("Failed to read integer samples", e)),
    }
}

/// Export a buffer to a WAV file in `format`
///
/// Integer formats are scaled by their full-scale value, rounded and
/// clamped; out-of-range samples saturate instead of wrapping.
pub fn export_audio(buffer: &AudioBuffer, path: &Path, format: SourceFormat) -> Result<()> {
    let spec = format.wav_spec(buffer.channels() as u16, buffer.sample_rate());
    let mut writer =
        WavWriter::create(path, spec).map_err(|e| invalid_audio("Failed to create WAV file", e))?;

    let scale = format.full_scale();
    let quantize = |sample: f64, min: f64, max: f64| (sample * scale).round().clamp(min, max);

    for sample in buffer.to_interleaved() {
        let written = match format {
            SourceFormat::Float32 => writer.write_sample(sample as f32),
            SourceFormat::Int8 => writer.write_sample(quantize(sample, -128.0, 127.0) as i8),
            SourceFormat::Int16 => writer.write_sample(quantize(sample, -32768.0, 32767.0) as i16),
            SourceFormat::Int24 => {
                writer.write_sample(quantize(sample, -8_388_608.0, 8_388_607.0) as i32)
            }
            SourceFormat::Int32 => {
                writer.write_sample(quantize(sample, i32::MIN as f64, i32::MAX as f64) as i32)
            }
        };
        written.map_err(|e| invalid_audio("Failed to write sample", e))?;
    }

    writer
        .finalize()
        .map_err(|e| invalid_audio("Failed to finalize WAV file", e))?;
    debug!("Exported {} ({:?})", path.display(), format);
    Ok(())
}

// ============================================================================
// Test Signals
// ============================================================================

/// Generate a mono sine tone at unit amplitude
pub fn generate_test_tone(frequency: f64, duration_secs: f64, sample_rate: u32) -> AudioBuffer {
    AudioBuffer::mono(sine(frequency, duration_secs, sample_rate), sample_rate)
}

/// Generate a stereo buffer with a different sine tone per channel
pub fn generate_stereo_test_tone(
    freq_left: f64,
    freq_right: f64,
    duration_secs: f64,
    sample_rate: u32,
) -> Result<AudioBuffer> {
    AudioBuffer::stereo(
        sine(freq_left, duration_secs, sample_rate),
        sine(freq_right, duration_secs, sample_rate),
        sample_rate,
    )
}

fn sine(frequency: f64, duration_secs: f64, sample_rate: u32) -> Vec<f64> {
    let num_samples = (duration_secs * sample_rate as f64).round() as usize;
    let angular_freq = 2.0 * PI * frequency / sample_rate as f64;
    (0..num_samples)
        .map(|i| (angular_freq * i as f64).sin())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
