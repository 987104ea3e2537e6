//! Band Splitter
//!
//! Splits a wideband signal into low and high bands around one crossover
//! frequency, plus a narrower lowpassed "direct path" band. All three use
//! zero-phase filtering, so `low + high` reconstructs the input without any
//! band-dependent delay.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dsp::filter::ButterworthFilter;
use crate::engine::AudioBuffer;
use crate::error::Result;

/// Default low/high crossover frequency in Hz
pub const DEFAULT_CROSSOVER_HZ: f64 = 1000.0;

/// Default direct-path lowpass cutoff in Hz
pub const DEFAULT_DIRECT_CUTOFF_HZ: f64 = 750.0;

/// Default Butterworth order for every band filter
pub const DEFAULT_FILTER_ORDER: usize = 10;

/// Band-split filter settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandSplitConfig {
    /// Low/high crossover frequency in Hz
    pub crossover_hz: f64,
    /// Direct-path lowpass cutoff in Hz
    pub direct_cutoff_hz: f64,
    /// Butterworth order
    pub order: usize,
}

impl Default for BandSplitConfig {
    fn default() -> Self {
        Self {
            crossover_hz: DEFAULT_CROSSOVER_HZ,
            direct_cutoff_hz: DEFAULT_DIRECT_CUTOFF_HZ,
            order: DEFAULT_FILTER_ORDER,
        }
    }
}

/// Selects one of the signals a [`Bands`] set holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    /// The unfiltered input
    Full,
    /// Below the crossover
    Low,
    /// Above the crossover
    High,
    /// Direct-path lowpass
    Direct,
}

/// Output of a band split, all sharing the input's length and rate
#[derive(Debug, Clone)]
pub struct Bands {
    pub full: AudioBuffer,
    pub low: AudioBuffer,
    pub high: AudioBuffer,
    pub direct: AudioBuffer,
}

impl Bands {
    /// Borrow the buffer for `band`
    pub fn get(&self, band: Band) -> &AudioBuffer {
        match band {
            Band::Full => &self.full,
            Band::Low => &self.low,
            Band::High => &self.high,
            Band::Direct => &self.direct,
        }
    }
}

/// Designed filter bank for one sample rate
#[derive(Debug, Clone)]
pub struct BandSplitter {
    config: BandSplitConfig,
    low: ButterworthFilter,
    high: ButterworthFilter,
    direct: ButterworthFilter,
}

impl BandSplitter {
    /// Design the three band filters
    ///
    /// # Errors
    /// `InvalidConfig` if a cutoff or the order cannot be realized at `sample_rate`
    pub fn new(config: BandSplitConfig, sample_rate: u32) -> Result<Self> {
        Ok(Self {
            config,
            low: ButterworthFilter::lowpass(config.crossover_hz, config.order, sample_rate)?,
            high: ButterworthFilter::highpass(config.crossover_hz, config.order, sample_rate)?,
            direct: ButterworthFilter::lowpass(config.direct_cutoff_hz, config.order, sample_rate)?,
        })
    }

    pub fn config(&self) -> &BandSplitConfig {
        &self.config
    }

    /// Split `signal` into full, low, high and direct bands
    ///
    /// # Errors
    /// `SampleRateMismatch` if `signal` was not recorded at the design rate
    pub fn split(&self, signal: &AudioBuffer) -> Result<Bands> {
        debug!(
            "Splitting {} samples at {} Hz (direct {} Hz, order {})",
            signal.len(),
            self.config.crossover_hz,
            self.config.direct_cutoff_hz,
            self.config.order
        );
        Ok(Bands {
            full: signal.clone(),
            low: self.low.apply(signal)?,
            high: self.high.apply(signal)?,
            direct: self.direct.apply(signal)?,
        })
    }
}
