//! Butterworth IIR filters
//!
//! Filters are designed as cascades of second-order sections (plus one
//! first-order section for odd orders) using the bilinear transform with
//! frequency pre-warping at the cutoff. Cascaded sections keep high orders
//! numerically stable where a single high-order polynomial would not.
//!
//! [`ButterworthFilter::filtfilt`] runs the cascade forward and then
//! backward, which cancels the phase response entirely: the result has the
//! squared magnitude response and zero group delay.

use std::f64::consts::PI;

use crate::engine::AudioBuffer;
use crate::error::{FadeError, Result};

/// Highest supported filter order
pub const MAX_ORDER: usize = 24;

/// Residual transient allowed at the edges of [`ButterworthFilter::filtfilt`]
const SETTLE_TOLERANCE: f64 = 1e-12;

/// Filter response type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Remove above cutoff
    LowPass,
    /// Remove below cutoff
    HighPass,
}

/// Section coefficients, normalized so a0 == 1
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SectionCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl SectionCoeffs {
    /// Bilinear transform of 1/(s^2 + s/q + 1) (or its highpass mirror)
    /// with `k = tan(pi * fc / fs)`
    fn second_order(filter_type: FilterType, k: f64, q: f64) -> Self {
        let k2 = k * k;
        let norm = 1.0 / (1.0 + k / q + k2);
        let a1 = 2.0 * (k2 - 1.0) * norm;
        let a2 = (1.0 - k / q + k2) * norm;
        match filter_type {
            FilterType::LowPass => {
                let b0 = k2 * norm;
                SectionCoeffs {
                    b0,
                    b1: 2.0 * b0,
                    b2: b0,
                    a1,
                    a2,
                }
            }
            FilterType::HighPass => SectionCoeffs {
                b0: norm,
                b1: -2.0 * norm,
                b2: norm,
                a1,
                a2,
            },
        }
    }

    /// Bilinear transform of 1/(s + 1) (or its highpass mirror)
    fn first_order(filter_type: FilterType, k: f64) -> Self {
        let norm = 1.0 / (1.0 + k);
        let a1 = (k - 1.0) * norm;
        match filter_type {
            FilterType::LowPass => SectionCoeffs {
                b0: k * norm,
                b1: k * norm,
                a1,
                ..Default::default()
            },
            FilterType::HighPass => SectionCoeffs {
                b0: norm,
                b1: -norm,
                a1,
                ..Default::default()
            },
        }
    }

    /// Steady-state gain for a constant input
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Magnitude of the section's slowest pole
    fn pole_radius(&self) -> f64 {
        let disc = self.a1 * self.a1 - 4.0 * self.a2;
        if disc < 0.0 {
            self.a2.sqrt()
        } else {
            let root = disc.sqrt();
            (-self.a1 + root).abs().max((-self.a1 - root).abs()) / 2.0
        }
    }

    /// Complex response at normalized angular frequency `w`, as (re, im)
    fn response(&self, w: f64) -> (f64, f64) {
        let (c1, s1) = (w.cos(), -w.sin());
        let (c2, s2) = ((2.0 * w).cos(), -(2.0 * w).sin());
        let num = (
            self.b0 + self.b1 * c1 + self.b2 * c2,
            self.b1 * s1 + self.b2 * s2,
        );
        let den = (1.0 + self.a1 * c1 + self.a2 * c2, self.a1 * s1 + self.a2 * s2);
        let den_mag2 = den.0 * den.0 + den.1 * den.1;
        (
            (num.0 * den.0 + num.1 * den.1) / den_mag2,
            (num.1 * den.0 - num.0 * den.1) / den_mag2,
        )
    }
}

/// Section state (Direct Form I)
#[derive(Debug, Clone, Copy, Default)]
struct SectionState {
    x1: f64, // x[n-1]
    x2: f64, // x[n-2]
    y1: f64, // y[n-1]
    y2: f64, // y[n-2]
}

impl SectionState {
    /// State the section would settle into after a long constant `input`
    fn steady(input: f64, coeffs: &SectionCoeffs) -> Self {
        let output = input * coeffs.dc_gain();
        SectionState {
            x1: input,
            x2: input,
            y1: output,
            y2: output,
        }
    }

    #[inline]
    fn process(&mut self, input: f64, coeffs: &SectionCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// Digital Butterworth lowpass/highpass filter
#[derive(Debug, Clone, PartialEq)]
pub struct ButterworthFilter {
    filter_type: FilterType,
    cutoff_hz: f64,
    order: usize,
    sample_rate: u32,
    sections: Vec<SectionCoeffs>,
}

impl ButterworthFilter {
    /// Design a Butterworth filter
    ///
    /// # Errors
    /// `InvalidConfig` if the order is 0 or above [`MAX_ORDER`], or the
    /// cutoff is not strictly between 0 Hz and Nyquist
    pub fn new(
        filter_type: FilterType,
        cutoff_hz: f64,
        order: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if order == 0 || order > MAX_ORDER {
            return Err(FadeError::config(format!(
                "filter order must be 1-{}, got {}",
                MAX_ORDER, order
            )));
        }
        let nyquist = sample_rate as f64 / 2.0;
        if !(cutoff_hz > 0.0 && cutoff_hz < nyquist) {
            return Err(FadeError::config(format!(
                "cutoff {} Hz must lie between 0 and Nyquist ({} Hz)",
                cutoff_hz, nyquist
            )));
        }

        let k = (PI * cutoff_hz / sample_rate as f64).tan();
        let mut sections: Vec<SectionCoeffs> = (0..order / 2)
            .map(|i| {
                let theta = PI * (2 * i + 1) as f64 / (2 * order) as f64;
                let q = 1.0 / (2.0 * theta.sin());
                SectionCoeffs::second_order(filter_type, k, q)
            })
            .collect();
        if order % 2 == 1 {
            sections.push(SectionCoeffs::first_order(filter_type, k));
        }

        Ok(Self {
            filter_type,
            cutoff_hz,
            order,
            sample_rate,
            sections,
        })
    }

    /// Design a Butterworth lowpass filter
    pub fn lowpass(cutoff_hz: f64, order: usize, sample_rate: u32) -> Result<Self> {
        Self::new(FilterType::LowPass, cutoff_hz, order, sample_rate)
    }

    /// Design a Butterworth highpass filter
    pub fn highpass(cutoff_hz: f64, order: usize, sample_rate: u32) -> Result<Self> {
        Self::new(FilterType::HighPass, cutoff_hz, order, sample_rate)
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff_hz
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Magnitude of the single-pass response at `freq_hz`
    pub fn magnitude_at(&self, freq_hz: f64) -> f64 {
        let w = 2.0 * PI * freq_hz / self.sample_rate as f64;
        self.sections
            .iter()
            .map(|s| {
                let (re, im) = s.response(w);
                (re * re + im * im).sqrt()
            })
            .product()
    }

    /// Edge padding used by [`filtfilt`](Self::filtfilt)
    ///
    /// Long enough for the slowest pole to decay below [`SETTLE_TOLERANCE`],
    /// so each pass is settled before it reaches the signal.
    fn pad_len(&self) -> usize {
        let radius = self
            .sections
            .iter()
            .map(SectionCoeffs::pole_radius)
            .fold(0.0, f64::max);
        let settle = if radius > 0.0 && radius < 1.0 {
            (SETTLE_TOLERANCE.ln() / radius.ln()).ceil() as usize
        } else {
            0
        };
        settle.max(3 * (2 * self.sections.len() + 1))
    }

    /// Single causal pass, starting from the steady state for `initial`
    fn run(&self, input: &[f64], initial: f64) -> Vec<f64> {
        let mut u = initial;
        let mut states: Vec<SectionState> = self
            .sections
            .iter()
            .map(|coeffs| {
                let state = SectionState::steady(u, coeffs);
                u *= coeffs.dc_gain();
                state
            })
            .collect();

        input
            .iter()
            .map(|&x| {
                self.sections
                    .iter()
                    .zip(states.iter_mut())
                    .fold(x, |v, (coeffs, state)| state.process(v, coeffs))
            })
            .collect()
    }

    /// Zero-phase forward/backward filtering
    ///
    /// Edges are extended by odd reflection (held constant past the length
    /// of the signal) and both passes start from steady state. The padding
    /// covers the filter's decay, so neither edge carries a start-up
    /// transient.
    pub fn filtfilt(&self, samples: &[f64]) -> Vec<f64> {
        let n = samples.len();
        if n == 0 {
            return Vec::new();
        }
        let pad = self.pad_len();
        let extended = odd_extend(samples, pad);

        let mut forward = self.run(&extended, extended[0]);
        forward.reverse();
        let mut backward = self.run(&forward, forward[0]);
        backward.reverse();

        backward[pad..pad + n].to_vec()
    }

    /// Zero-phase filter every channel of a buffer
    ///
    /// # Errors
    /// `SampleRateMismatch` if the buffer rate differs from the design rate
    pub fn apply(&self, buffer: &AudioBuffer) -> Result<AudioBuffer> {
        if buffer.sample_rate() != self.sample_rate {
            return Err(FadeError::SampleRateMismatch {
                expected: self.sample_rate,
                found: buffer.sample_rate(),
            });
        }
        Ok(buffer.map_channels(|ch| self.filtfilt(ch)))
    }
}

/// Extend both ends by `pad` samples, reflected through the end points
///
/// At most `n - 1` samples can be reflected; beyond that the outermost
/// reflected value is held.
fn odd_extend(samples: &[f64], pad: usize) -> Vec<f64> {
    let n = samples.len();
    let reflect = pad.min(n - 1);
    let hold = pad - reflect;
    let first = samples[0];
    let last = samples[n - 1];
    let head_hold = 2.0 * first - samples[reflect];
    let tail_hold = 2.0 * last - samples[n - 1 - reflect];

    let mut out = Vec::with_capacity(n + 2 * pad);
    out.extend(std::iter::repeat(head_hold).take(hold));
    out.extend((1..=reflect).rev().map(|i| 2.0 * first - samples[i]));
    out.extend_from_slice(samples);
    out.extend((1..=reflect).map(|i| 2.0 * last - samples[n - 1 - i]));
    out.extend(std::iter::repeat(tail_hold).take(hold));
    out
}
