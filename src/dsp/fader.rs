//! Transition Engine
//!
//! Synthesizes a stimulus whose level (or the level of one frequency band)
//! moves smoothly between unity and a floor gain, then mixes back an
//! unprocessed direct-path signal the way sound reaches the ear around a
//! hearing aid.
//!
//! The engine is a pipeline of pure stages, each consuming the previous
//! stage's output:
//!
//! 1. [`segment`] - cut the changing band into head / ramp / tail
//! 2. [`Envelope::build`] - per-sample gain curve
//! 3. [`gate`] - apply the envelope
//! 4. [`recombine`] - add back the band held stable
//! 5. [`add_direct_path`] - delay-align and mix the leveled direct path
//! 6. [`measure_drop`] - RMS of the stable head vs. the stable tail

use log::{debug, info};

use crate::dsp::bands::{Band, BandSplitConfig, BandSplitter, Bands};
use crate::dsp::envelope::{Direction, Envelope, SegmentPlan, StablePlacement};
use crate::dsp::level::{db2mag, round_db};
use crate::dsp::normalize::{set_rms, ChannelBalance};
use crate::engine::AudioBuffer;
use crate::error::{FadeError, Result};

/// Default direct-path delay in milliseconds
pub const DEFAULT_DIRECT_DELAY_MS: f64 = 5.0;

/// Delay in samples for `delay_ms` at `sample_rate`, rounded up
pub fn delay_samples(sample_rate: u32, delay_ms: f64) -> usize {
    (delay_ms * sample_rate as f64 / 1000.0).ceil() as usize
}

/// Convert seconds to a whole number of samples
fn secs_to_samples(secs: f64, sample_rate: u32) -> usize {
    (secs * sample_rate as f64).round() as usize
}

// ============================================================================
// Transition Spec
// ============================================================================

/// Configuration for one fade operation
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionSpec {
    /// Sample rate shared by every buffer in the operation (Hz)
    pub sample_rate: u32,
    /// Length of the gain ramp in seconds
    pub transition_secs: f64,
    /// Length of each stable region in seconds
    pub stable_secs: f64,
    pub stable_placement: StablePlacement,
    /// Linear gain reached at full attenuation
    pub floor_magnitude: f64,
    /// Direct path level below the original signal (dB)
    pub gain_drop_db: f64,
    pub direction: Direction,
    /// Mix the delayed direct path back in
    pub direct_path: bool,
    /// Processing latency of the hearing-aid path (ms)
    pub direct_delay_ms: f64,
}

impl TransitionSpec {
    /// Spec with the reference defaults: 5 s stable regions on both sides,
    /// -10 dB floor, 6 dB direct-path drop, decreasing, direct path on
    pub fn new(sample_rate: u32, transition_secs: f64) -> Self {
        Self {
            sample_rate,
            transition_secs,
            stable_secs: 5.0,
            stable_placement: StablePlacement::Both,
            floor_magnitude: db2mag(-10.0),
            gain_drop_db: 6.0,
            direction: Direction::Decrease,
            direct_path: true,
            direct_delay_ms: DEFAULT_DIRECT_DELAY_MS,
        }
    }

    /// Check every field before any buffer work happens
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(FadeError::config("sample rate must be positive"));
        }
        if !(self.transition_secs.is_finite() && self.transition_secs > 0.0) {
            return Err(FadeError::config(format!(
                "transition duration must be positive, got {} s",
                self.transition_secs
            )));
        }
        if !(self.stable_secs.is_finite() && self.stable_secs >= 0.0) {
            return Err(FadeError::config(format!(
                "stable duration must be non-negative, got {} s",
                self.stable_secs
            )));
        }
        if self.stable_placement != StablePlacement::None && self.stable_samples() == 0 {
            return Err(FadeError::config(format!(
                "stable placement '{}' needs a non-zero stable duration",
                self.stable_placement
            )));
        }
        if self.transition_samples() == 0 {
            return Err(FadeError::config("transition is shorter than one sample"));
        }
        if !(self.floor_magnitude > 0.0 && self.floor_magnitude <= 1.0) {
            return Err(FadeError::config(format!(
                "floor magnitude must be in (0, 1], got {}",
                self.floor_magnitude
            )));
        }
        if !self.gain_drop_db.is_finite() {
            return Err(FadeError::config("direct path gain drop must be finite"));
        }
        if !(self.direct_delay_ms.is_finite() && self.direct_delay_ms >= 0.0) {
            return Err(FadeError::config(format!(
                "direct path delay must be non-negative, got {} ms",
                self.direct_delay_ms
            )));
        }
        // the delayed mix loses `delay` samples off the end stable region
        if self.stable_placement == StablePlacement::Both
            && self.delay_samples() >= self.stable_samples()
        {
            return Err(FadeError::config(format!(
                "stable region ({} samples) must be longer than the direct path delay ({} samples)",
                self.stable_samples(),
                self.delay_samples()
            )));
        }
        Ok(())
    }

    pub fn stable_samples(&self) -> usize {
        secs_to_samples(self.stable_secs, self.sample_rate)
    }

    pub fn transition_samples(&self) -> usize {
        secs_to_samples(self.transition_secs, self.sample_rate)
    }

    pub fn delay_samples(&self) -> usize {
        if self.direct_path {
            delay_samples(self.sample_rate, self.direct_delay_ms)
        } else {
            0
        }
    }

    pub fn segment_plan(&self) -> SegmentPlan {
        SegmentPlan::new(
            self.stable_placement,
            self.stable_samples(),
            self.transition_samples(),
        )
    }

    /// Total duration in seconds implied by the placement
    pub fn total_secs(&self) -> f64 {
        self.segment_plan().total() as f64 / self.sample_rate as f64
    }
}

// ============================================================================
// Pipeline stages
// ============================================================================

/// The changing band cut at the segment edges
#[derive(Debug, Clone)]
pub struct Segments {
    pub start: AudioBuffer,
    pub transition: AudioBuffer,
    pub end: AudioBuffer,
    /// End of the stable head (sample index)
    pub edge1: usize,
    /// Start of the stable tail (sample index)
    pub edge2: usize,
}

/// Cut `change` into head, ramp and tail
///
/// # Errors
/// `InsufficientDuration` if `change` is shorter than the plan
pub fn segment(change: &AudioBuffer, plan: &SegmentPlan) -> Result<Segments> {
    let (edge1, edge2, total) = (plan.edge1(), plan.edge2(), plan.total());
    if change.len() < total {
        return Err(FadeError::InsufficientDuration {
            required: total,
            available: change.len(),
        });
    }
    debug!("Segment edges at {} and {} of {} samples", edge1, edge2, total);
    Ok(Segments {
        start: change.slice(0..edge1)?,
        transition: change.slice(edge1..edge2)?,
        end: change.slice(edge2..total)?,
        edge1,
        edge2,
    })
}

/// Apply `envelope` to the changing band
pub fn gate(change: &AudioBuffer, envelope: &Envelope) -> Result<AudioBuffer> {
    envelope.apply(change)
}

/// Add the band held stable to the gated band (the hearing-aid output)
///
/// # Errors
/// * `ChannelMismatch` / `SampleRateMismatch` - bands are incompatible
/// * `InsufficientDuration` - the stable band is shorter than the gated band
pub fn recombine(gated: &AudioBuffer, stable: Option<&AudioBuffer>) -> Result<AudioBuffer> {
    match stable {
        Some(stable) => gated.mix_truncated(stable),
        None => Ok(gated.clone()),
    }
}

/// The two delay-aligned paths and their sum
#[derive(Debug, Clone)]
pub struct DirectPathMix {
    /// Hearing-aid output with its trailing `delay` samples dropped
    pub processed: AudioBuffer,
    /// Direct path with its leading `delay` samples dropped, leveled
    pub direct: AudioBuffer,
    pub combined: AudioBuffer,
}

/// Delay-align the direct path against the hearing-aid output, level it to
/// `reference_db - gain_drop_db`, and sum
///
/// # Errors
/// * `ChannelMismatch` / `SampleRateMismatch` - paths are incompatible
/// * `InsufficientDuration` - either path is too short for the delay
pub fn add_direct_path(
    ha_out: &AudioBuffer,
    direct: &AudioBuffer,
    reference_db: f64,
    gain_drop_db: f64,
    delay: usize,
) -> Result<DirectPathMix> {
    ha_out.check_compatible(direct)?;
    if ha_out.len() <= delay {
        return Err(FadeError::InsufficientDuration {
            required: delay + 1,
            available: ha_out.len(),
        });
    }

    let direct = direct.truncated(ha_out.len())?;
    let processed = ha_out.drop_back(delay)?;
    let direct = direct.skip_front(delay)?;
    let target_db = reference_db - gain_drop_db;
    debug!(
        "Direct path delayed {} samples, leveled to {:.2} dB",
        delay, target_db
    );
    let direct = set_rms(&direct, target_db, ChannelBalance::PreserveIld)?;
    let combined = processed.add(&direct)?;

    Ok(DirectPathMix {
        processed,
        direct,
        combined,
    })
}

/// Head and tail levels of the gated and final signals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RmsDrop {
    pub gated_start_db: f64,
    pub gated_end_db: f64,
    pub final_start_db: f64,
    pub final_end_db: f64,
}

impl RmsDrop {
    /// Level change across the ramp before the direct path is added
    pub fn gated_drop_db(&self) -> f64 {
        self.gated_start_db - self.gated_end_db
    }

    /// Level change across the ramp in the final signal
    pub fn final_drop_db(&self) -> f64 {
        self.final_start_db - self.final_end_db
    }
}

/// Compare `[0, edge1)` against `[edge2, end)` in both signals
pub fn measure_drop(
    gated: &AudioBuffer,
    final_signal: &AudioBuffer,
    edge1: usize,
    edge2: usize,
) -> Result<RmsDrop> {
    Ok(RmsDrop {
        gated_start_db: gated.slice(0..edge1)?.rms_db()?,
        gated_end_db: gated.slice(edge2..gated.len())?.rms_db()?,
        final_start_db: final_signal.slice(0..edge1)?.rms_db()?,
        final_end_db: final_signal.slice(edge2..final_signal.len())?.rms_db()?,
    })
}

// ============================================================================
// Transition Result
// ============================================================================

/// Everything one `run` produced
#[derive(Debug, Clone)]
pub struct TransitionResult {
    pub envelope: Envelope,
    pub edge1: usize,
    pub edge2: usize,
    /// Changing band after the envelope
    pub gated_segment: AudioBuffer,
    /// Gated band plus the stable band (hearing-aid output)
    pub recombined_with_stable_band: AudioBuffer,
    /// Final stimulus, direct path included when enabled
    pub final_with_direct_path: AudioBuffer,
    /// Level of the source, rounded to 0.01 dB
    pub original_rms_db: f64,
    pub gated_rms_db: f64,
    pub ha_rms_db: f64,
    /// Level of the leveled direct path, if mixed in
    pub direct_rms_db: Option<f64>,
    pub delay_samples: usize,
    /// Only present with stable regions on both sides
    pub drop: Option<RmsDrop>,
}

// ============================================================================
// Transition Engine
// ============================================================================

/// Band-split source plus the [`TransitionSpec`] for one stimulus
///
/// Construction truncates the source to the duration the plan needs and
/// filters it once; every [`run`](Self::run) reuses those bands.
///
/// # Example
/// ```
/// use bandfade::dsp::{Band, TransitionEngine, TransitionSpec};
/// use bandfade::engine::AudioBuffer;
///
/// let mut spec = TransitionSpec::new(8000, 0.5);
/// spec.stable_secs = 0.25;
/// let signal = AudioBuffer::mono(vec![0.5; 8000], 8000);
///
/// let engine = TransitionEngine::new(&signal, spec).unwrap();
/// let result = engine.run(Band::Low, Some(Band::High)).unwrap();
/// assert_eq!(result.gated_segment.len(), 8000);
/// ```
#[derive(Debug, Clone)]
pub struct TransitionEngine {
    spec: TransitionSpec,
    plan: SegmentPlan,
    bands: Bands,
}

impl TransitionEngine {
    /// Build an engine with the default band split
    pub fn new(signal: &AudioBuffer, spec: TransitionSpec) -> Result<Self> {
        Self::with_band_split(signal, spec, BandSplitConfig::default())
    }

    /// Build an engine with custom band-split filters
    ///
    /// # Errors
    /// * `InvalidConfig` - the transition or filter settings are invalid
    /// * `SampleRateMismatch` - the signal rate differs from `spec.sample_rate`
    /// * `InsufficientDuration` - the signal is shorter than the segment plan
    pub fn with_band_split(
        signal: &AudioBuffer,
        spec: TransitionSpec,
        split: BandSplitConfig,
    ) -> Result<Self> {
        spec.validate()?;
        if signal.sample_rate() != spec.sample_rate {
            return Err(FadeError::SampleRateMismatch {
                expected: spec.sample_rate,
                found: signal.sample_rate(),
            });
        }
        let plan = spec.segment_plan();
        let signal = signal.truncated(plan.total())?;
        let bands = BandSplitter::new(split, spec.sample_rate)?.split(&signal)?;

        Ok(Self { spec, plan, bands })
    }

    pub fn spec(&self) -> &TransitionSpec {
        &self.spec
    }

    pub fn plan(&self) -> &SegmentPlan {
        &self.plan
    }

    pub fn bands(&self) -> &Bands {
        &self.bands
    }

    /// Ramp `change`, holding `stable` (if any) at its original level
    pub fn run(&self, change: Band, stable: Option<Band>) -> Result<TransitionResult> {
        if stable == Some(change) {
            return Err(FadeError::config(
                "the stable band must differ from the changing band",
            ));
        }
        self.run_with(self.bands.get(change), stable.map(|b| self.bands.get(b)))
    }

    /// Ramp an externally supplied band against this engine's source
    ///
    /// All compatibility and duration checks happen before any processing.
    pub fn run_with(
        &self,
        change: &AudioBuffer,
        stable: Option<&AudioBuffer>,
    ) -> Result<TransitionResult> {
        let source = &self.bands.full;
        source.check_compatible(change)?;
        if let Some(stable) = stable {
            change.check_compatible(stable)?;
            if stable.len() < self.plan.total() {
                return Err(FadeError::InsufficientDuration {
                    required: self.plan.total(),
                    available: stable.len(),
                });
            }
        }

        let segments = segment(change, &self.plan)?;
        let envelope = Envelope::build(self.spec.direction, self.spec.floor_magnitude, &self.plan);
        debug!(
            "Envelope: {} samples, {} -> {}",
            envelope.len(),
            self.spec.direction,
            self.spec.floor_magnitude
        );
        let gated = gate(change, &envelope)?;
        let ha_out = recombine(&gated, stable)?;

        let original_rms_db = round_db(source.rms_db()?);
        let delay = self.spec.delay_samples();
        let (final_signal, direct_rms_db) = if self.spec.direct_path {
            let mix = add_direct_path(
                &ha_out,
                &self.bands.direct,
                original_rms_db,
                self.spec.gain_drop_db,
                delay,
            )?;
            let direct_db = mix.direct.rms_db()?;
            (mix.combined, Some(direct_db))
        } else {
            (ha_out.clone(), None)
        };

        let gated_rms_db = gated.rms_db()?;
        let ha_rms_db = ha_out.rms_db()?;
        info!("Original signal RMS: {:.2} dB", original_rms_db);
        info!("HA signal RMS: {:.2} dB", ha_rms_db);
        if let Some(direct_db) = direct_rms_db {
            info!("Direct path signal RMS: {:.2} dB", direct_db);
        }

        let drop = if self.spec.stable_placement == StablePlacement::Both {
            let drop = measure_drop(&gated, &final_signal, segments.edge1, segments.edge2)?;
            info!("HA signal RMS drop: {:.2} dB", drop.gated_drop_db());
            info!(
                "HA signal + direct path signal RMS drop: {:.2} dB",
                drop.final_drop_db()
            );
            Some(drop)
        } else {
            None
        };

        Ok(TransitionResult {
            envelope,
            edge1: segments.edge1,
            edge2: segments.edge2,
            gated_segment: gated,
            recombined_with_stable_band: ha_out,
            final_with_direct_path: final_signal,
            original_rms_db,
            gated_rms_db,
            ha_rms_db,
            direct_rms_db,
            delay_samples: delay,
            drop,
        })
    }
}
