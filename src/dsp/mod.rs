//! DSP Library
//!
//! Level metering, leveling, zero-phase band splitting, gain envelopes and
//! the transition engine built on top of them.

pub mod bands;
pub mod envelope;
pub mod fader;
pub mod filter;
pub mod level;
pub mod normalize;

pub use bands::{Band, BandSplitConfig, BandSplitter, Bands};
pub use envelope::{Direction, Envelope, SegmentPlan, StablePlacement};
pub use fader::{RmsDrop, TransitionEngine, TransitionResult, TransitionSpec};
pub use filter::{ButterworthFilter, FilterType};
pub use level::{db2mag, mag2db, rms};
pub use normalize::{normalize_peak, set_rms, ChannelBalance};
