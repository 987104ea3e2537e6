//! Gain envelopes for level transitions
//!
//! An envelope is a per-sample linear gain sequence laid out as an optional
//! stable head, a linear ramp, and an optional stable tail.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::AudioBuffer;
use crate::error::{FadeError, Result};

// ============================================================================
// Direction / Placement
// ============================================================================

/// Which way the level moves across the transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Direction {
    /// Ramp from the floor up to unity gain
    Increase,
    /// Ramp from unity gain down to the floor
    #[default]
    Decrease,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Increase => "increase",
            Direction::Decrease => "decrease",
        }
    }

    /// Gains at the (head, tail) of the envelope
    fn endpoints(&self, floor: f64) -> (f64, f64) {
        match self {
            Direction::Increase => (floor, 1.0),
            Direction::Decrease => (1.0, floor),
        }
    }
}

impl FromStr for Direction {
    type Err = FadeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "increase" => Ok(Direction::Increase),
            "decrease" => Ok(Direction::Decrease),
            other => Err(FadeError::config(format!(
                "unknown direction '{}' (expected increase or decrease)",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Direction {
    type Error = FadeError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Direction> for String {
    fn from(value: Direction) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the constant-gain regions sit around the ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StablePlacement {
    /// Stable head and stable tail
    #[default]
    Both,
    /// Stable head only
    StartOnly,
    /// Ramp only
    None,
}

impl StablePlacement {
    pub fn as_str(&self) -> &'static str {
        match self {
            StablePlacement::Both => "both",
            StablePlacement::StartOnly => "start",
            StablePlacement::None => "none",
        }
    }

    pub fn has_head(&self) -> bool {
        matches!(self, StablePlacement::Both | StablePlacement::StartOnly)
    }

    pub fn has_tail(&self) -> bool {
        matches!(self, StablePlacement::Both)
    }
}

impl FromStr for StablePlacement {
    type Err = FadeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "both" => Ok(StablePlacement::Both),
            "start" => Ok(StablePlacement::StartOnly),
            "none" => Ok(StablePlacement::None),
            other => Err(FadeError::config(format!(
                "unsupported stable placement '{}' (expected both, start or none)",
                other
            ))),
        }
    }
}

impl TryFrom<String> for StablePlacement {
    type Error = FadeError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<StablePlacement> for String {
    fn from(value: StablePlacement) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for StablePlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Segment plan
// ============================================================================

/// Sample layout of one transition: `[0, edge1)` head, `[edge1, edge2)` ramp,
/// `[edge2, total)` tail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPlan {
    pub head: usize,
    pub transition: usize,
    pub tail: usize,
}

impl SegmentPlan {
    /// Lay out head/ramp/tail for a placement
    pub fn new(placement: StablePlacement, stable: usize, transition: usize) -> Self {
        Self {
            head: if placement.has_head() { stable } else { 0 },
            transition,
            tail: if placement.has_tail() { stable } else { 0 },
        }
    }

    /// End of the stable head
    pub fn edge1(&self) -> usize {
        self.head
    }

    /// Start of the stable tail
    pub fn edge2(&self) -> usize {
        self.head + self.transition
    }

    /// Samples needed from the source
    pub fn total(&self) -> usize {
        self.head + self.transition + self.tail
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// `n` evenly spaced values from `start` to `end` inclusive
fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 {
        (end - start) / (n - 1) as f64
    } else {
        0.0
    };
    (0..n).map(move |i| if i + 1 == n && n > 1 { end } else { start + step * i as f64 })
}

/// Per-sample linear gains for one transition
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    gains: Vec<f64>,
}

impl Envelope {
    /// Build the envelope for `plan`, ramping between unity and `floor`
    pub fn build(direction: Direction, floor: f64, plan: &SegmentPlan) -> Self {
        let (head_gain, tail_gain) = direction.endpoints(floor);
        let gains = std::iter::repeat(head_gain)
            .take(plan.head)
            .chain(linspace(head_gain, tail_gain, plan.transition))
            .chain(std::iter::repeat(tail_gain).take(plan.tail))
            .collect();
        Self { gains }
    }

    pub fn len(&self) -> usize {
        self.gains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gains.is_empty()
    }

    pub fn gains(&self) -> &[f64] {
        &self.gains
    }

    /// Multiply the first `len()` samples of every channel by the envelope
    ///
    /// # Errors
    /// `InsufficientDuration` if the buffer is shorter than the envelope
    pub fn apply(&self, buffer: &AudioBuffer) -> Result<AudioBuffer> {
        let segment = buffer.truncated(self.len())?;
        Ok(segment.map_channels(|ch| {
            ch.iter()
                .zip(&self.gains)
                .map(|(sample, gain)| sample * gain)
                .collect()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::level::db2mag;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    #[test_case("both", StablePlacement::Both)]
    #[test_case("start", StablePlacement::StartOnly)]
    #[test_case("None", StablePlacement::None)]
    fn test_parse_placement(input: &str, expected: StablePlacement) {
        assert_eq!(input.parse::<StablePlacement>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unsupported_placement() {
        let err = "end".parse::<StablePlacement>().unwrap_err();
        assert!(matches!(err, FadeError::InvalidConfig { .. }));
        assert!(err.to_string().contains("end"));
    }

    #[test]
    fn test_parse_direction() {
        assert_eq!("Increase".parse::<Direction>().unwrap(), Direction::Increase);
        assert_eq!("decrease".parse::<Direction>().unwrap(), Direction::Decrease);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_serde_strings() {
        let json = serde_json::to_string(&StablePlacement::StartOnly).unwrap();
        assert_eq!(json, "\"start\"");
        let parsed: Direction = serde_json::from_str("\"increase\"").unwrap();
        assert_eq!(parsed, Direction::Increase);
        assert!(serde_json::from_str::<StablePlacement>("\"end\"").is_err());
    }

    #[test]
    fn test_segment_plan() {
        let both = SegmentPlan::new(StablePlacement::Both, 100, 50);
        assert_eq!((both.edge1(), both.edge2(), both.total()), (100, 150, 250));

        let start = SegmentPlan::new(StablePlacement::StartOnly, 100, 50);
        assert_eq!((start.edge1(), start.edge2(), start.total()), (100, 150, 150));

        let none = SegmentPlan::new(StablePlacement::None, 100, 50);
        assert_eq!((none.edge1(), none.edge2(), none.total()), (0, 50, 50));
    }

    #[test]
    fn test_decrease_envelope_shape() {
        let floor = db2mag(-10.0);
        let plan = SegmentPlan::new(StablePlacement::Both, 1000, 500);
        let env = Envelope::build(Direction::Decrease, floor, &plan);
        let gains = env.gains();

        assert_eq!(env.len(), 2500);
        assert_eq!(gains[0], 1.0);
        assert_eq!(gains[999], 1.0);
        assert_eq!(gains[1000], 1.0);
        assert_abs_diff_eq!(gains[1499], floor, epsilon = 1e-15);
        assert_abs_diff_eq!(gains[2499], floor, epsilon = 1e-15);
        assert!(gains[1000..1500].windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_increase_mirrors_decrease() {
        let floor = 0.25;
        let plan = SegmentPlan::new(StablePlacement::Both, 10, 20);
        let up = Envelope::build(Direction::Increase, floor, &plan);
        let down = Envelope::build(Direction::Decrease, floor, &plan);

        assert_eq!(up.gains()[0], floor);
        assert_eq!(*up.gains().last().unwrap(), 1.0);
        assert!(up.gains()[10..30].windows(2).all(|w| w[1] >= w[0]));
        // ramp is the time reverse of the decreasing ramp
        for (a, b) in up.gains().iter().zip(down.gains().iter().rev()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_placement_trims_envelope() {
        let start = Envelope::build(
            Direction::Decrease,
            0.5,
            &SegmentPlan::new(StablePlacement::StartOnly, 10, 20),
        );
        assert_eq!(start.len(), 30);
        assert_eq!(*start.gains().last().unwrap(), 0.5);

        let ramp_only = Envelope::build(
            Direction::Decrease,
            0.5,
            &SegmentPlan::new(StablePlacement::None, 10, 20),
        );
        assert_eq!(ramp_only.len(), 20);
        assert_eq!(ramp_only.gains()[0], 1.0);
        assert_eq!(ramp_only.gains()[19], 0.5);
    }

    #[test]
    fn test_apply_truncates_and_multiplies() {
        let env = Envelope::build(
            Direction::Decrease,
            0.0,
            &SegmentPlan::new(StablePlacement::None, 0, 3),
        );
        let buffer = AudioBuffer::mono(vec![2.0; 5], 48000);
        let gated = env.apply(&buffer).unwrap();
        assert_eq!(gated.channel(0), &[2.0, 1.0, 0.0]);

        let short = AudioBuffer::mono(vec![2.0; 2], 48000);
        assert!(matches!(
            env.apply(&short),
            Err(FadeError::InsufficientDuration {
                required: 3,
                available: 2
            })
        ));
    }
}
