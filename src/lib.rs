//! Bandfade - gain-transition stimulus generator
//!
//! Bandfade synthesizes test stimuli whose loudness, or the loudness of one
//! frequency band, moves smoothly between two levels while the rest of the
//! signal stays put.
//!
//! # Architecture
//!
//! - `engine`: audio buffers and WAV I/O
//! - `dsp`: level metering, normalization, band splitting, envelopes and the
//!   transition engine itself
//! - `controller`: batch rendering of the overall / low-band / high-band
//!   conditions
//! - `sink`: destinations for finished stimuli

pub mod cli;
pub mod config;
pub mod controller;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod sink;

pub use error::{FadeError, Result};
