//! Audio Buffer Management
//!
//! Provides the core audio buffer type for Bandfade. Samples are 64-bit
//! floats, normalized to the full-scale range of the source format by the
//! codec adapter. Every operation here returns a new buffer; callers' data is
//! never modified in place.

use std::ops::Range;

use crate::dsp::level;
use crate::error::{FadeError, Result};

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    #[default]
    Mono,
    /// Two channels (stereo: left, right)
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

/// Core audio buffer type
///
/// Stores audio as non-interleaved 64-bit floating point samples.
/// Each channel is a separate `Vec<f64>`; all channels have the same length.
///
/// # Example
/// ```
/// use bandfade::engine::{AudioBuffer, ChannelLayout};
///
/// // Create a 1-second stereo buffer at 48 kHz
/// let buffer = AudioBuffer::new(48000, ChannelLayout::Stereo, 48000);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.len(), 48000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<Vec<f64>>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a new silent buffer with the specified length and layout
    pub fn new(num_samples: usize, layout: ChannelLayout, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0; num_samples]; layout.num_channels()],
            sample_rate,
        }
    }

    /// Create a mono buffer from a sample vector
    pub fn mono(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples: vec![samples],
            sample_rate,
        }
    }

    /// Create a stereo buffer from left and right sample vectors
    ///
    /// # Errors
    /// `InvalidConfig` if the channels differ in length
    pub fn stereo(left: Vec<f64>, right: Vec<f64>, sample_rate: u32) -> Result<Self> {
        Self::from_channels(vec![left, right], sample_rate)
    }

    /// Create a buffer from per-channel sample vectors
    ///
    /// # Errors
    /// * `UnsupportedFormat` - channel count is not 1 or 2
    /// * `InvalidConfig` - channels differ in length
    pub fn from_channels(samples: Vec<Vec<f64>>, sample_rate: u32) -> Result<Self> {
        if ChannelLayout::from_count(samples.len()).is_none() {
            return Err(FadeError::UnsupportedFormat {
                format: format!("{}-channel audio (only mono/stereo supported)", samples.len()),
            });
        }
        let len = samples[0].len();
        if samples.iter().any(|ch| ch.len() != len) {
            return Err(FadeError::config("all channels must have the same length"));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Errors
    /// `InvalidAudio` if the data length doesn't divide by the channel count
    pub fn from_interleaved(
        interleaved: &[f64],
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Result<Self> {
        let num_channels = layout.num_channels();

        if interleaved.len() % num_channels != 0 {
            return Err(FadeError::InvalidAudio {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
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

    /// Convert the buffer to interleaved format (L, R, L, R, ... for stereo)
    pub fn to_interleaved(&self) -> Vec<f64> {
        let mut interleaved = Vec::with_capacity(self.channels() * self.len());
        for idx in 0..self.len() {
            for channel in &self.samples {
                interleaved.push(channel[idx]);
            }
        }
        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Get the channel layout
    pub fn channel_layout(&self) -> Option<ChannelLayout> {
        ChannelLayout::from_count(self.channels())
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f64] {
        &self.samples[index]
    }

    /// Iterate over all channels
    pub fn iter_channels(&self) -> impl Iterator<Item = &[f64]> {
        self.samples.iter().map(|ch| ch.as_slice())
    }

    // ------------------------------------------------------------------------
    // Derived buffers
    // ------------------------------------------------------------------------

    /// Build a new buffer by transforming each channel
    pub fn map_channels<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&[f64]) -> Vec<f64>,
    {
        Self {
            samples: self.samples.iter().map(|ch| f(ch)).collect(),
            sample_rate: self.sample_rate,
        }
    }

    /// Multiply every sample by a linear gain
    pub fn scaled(&self, gain: f64) -> Self {
        self.map_channels(|ch| ch.iter().map(|&s| s * gain).collect())
    }

    /// Apply gain in decibels to every sample
    pub fn with_gain_db(&self, gain_db: f64) -> Self {
        self.scaled(level::db2mag(gain_db))
    }

    /// Samples in `range`, per channel
    ///
    /// # Errors
    /// `InsufficientDuration` if the range extends past the end of the buffer
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        if range.end > self.len() {
            return Err(FadeError::InsufficientDuration {
                required: range.end,
                available: self.len(),
            });
        }
        let range = range.start.min(range.end)..range.end;
        Ok(self.map_channels(|ch| ch[range.clone()].to_vec()))
    }

    /// First `len` samples
    ///
    /// # Errors
    /// `InsufficientDuration` if the buffer is shorter than `len`
    pub fn truncated(&self, len: usize) -> Result<Self> {
        self.slice(0..len)
    }

    /// Drop the first `n` samples
    pub fn skip_front(&self, n: usize) -> Result<Self> {
        self.slice(n.min(self.len())..self.len())
    }

    /// Drop the last `n` samples
    pub fn drop_back(&self, n: usize) -> Result<Self> {
        self.slice(0..self.len().saturating_sub(n))
    }

    /// Ensure `other` shares this buffer's channel count and sample rate
    pub fn check_compatible(&self, other: &AudioBuffer) -> Result<()> {
        if self.channels() != other.channels() {
            return Err(FadeError::ChannelMismatch {
                expected: self.channels(),
                found: other.channels(),
            });
        }
        if self.sample_rate != other.sample_rate {
            return Err(FadeError::SampleRateMismatch {
                expected: self.sample_rate,
                found: other.sample_rate,
            });
        }
        Ok(())
    }

    /// Sample-wise sum of two equal-length buffers
    pub fn add(&self, other: &AudioBuffer) -> Result<Self> {
        self.check_compatible(other)?;
        if self.len() != other.len() {
            return Err(FadeError::config(format!(
                "cannot add buffers of different length ({} vs {})",
                self.len(),
                other.len()
            )));
        }
        let samples = self
            .samples
            .iter()
            .zip(&other.samples)
            .map(|(a, b)| a.iter().zip(b).map(|(x, y)| x + y).collect())
            .collect();
        Ok(Self {
            samples,
            sample_rate: self.sample_rate,
        })
    }

    /// Sum `other` into this buffer over this buffer's length
    ///
    /// # Errors
    /// `InsufficientDuration` if `other` is shorter than this buffer
    pub fn mix_truncated(&self, other: &AudioBuffer) -> Result<Self> {
        self.check_compatible(other)?;
        self.add(&other.truncated(self.len())?)
    }

    // ------------------------------------------------------------------------
    // Measurements
    // ------------------------------------------------------------------------

    /// Linear RMS over all channels
    pub fn rms(&self) -> Result<f64> {
        level::rms_multi(self.iter_channels())
    }

    /// RMS over all channels in dB
    pub fn rms_db(&self) -> Result<f64> {
        level::mag2db(self.rms()?)
    }

    /// RMS of one channel in dB
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    pub fn channel_rms_db(&self, channel: usize) -> Result<f64> {
        level::mag2db(level::rms(self.channel(channel))?)
    }

    /// Largest absolute sample value across all channels
    pub fn peak(&self) -> f64 {
        self.samples
            .iter()
            .flat_map(|ch| ch.iter())
            .map(|s| s.abs())
            .fold(0.0, f64::max)
    }
}

// ============================================================================
// Tests
// ============================================================================
