//! Conditions controller
//!
//! Renders one stimulus per (transition duration, condition) pair. Each
//! pair is an independent engine run, so the batch is spread across the
//! rayon pool; results come back in config order regardless of which
//! worker finished first.

use std::fmt;

use clap::ValueEnum;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::FaderConfig;
use crate::dsp::bands::Band;
use crate::dsp::envelope::Direction;
use crate::dsp::fader::{TransitionEngine, TransitionResult};
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::sink::AudioSink;

/// Which part of the spectrum changes level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Condition {
    /// Overall gain: the full-band signal ramps, nothing is held
    #[serde(rename = "oag")]
    #[value(name = "oag")]
    Overall,
    /// Low-frequency gain: the low band ramps, the high band is held
    #[serde(rename = "lfg")]
    #[value(name = "lfg")]
    LowBand,
    /// High-frequency gain: the high band ramps, the low band is held
    #[serde(rename = "hfg")]
    #[value(name = "hfg")]
    HighBand,
}

impl Condition {
    pub fn change_band(&self) -> Band {
        match self {
            Condition::Overall => Band::Full,
            Condition::LowBand => Band::Low,
            Condition::HighBand => Band::High,
        }
    }

    pub fn stable_band(&self) -> Option<Band> {
        match self {
            Condition::Overall => None,
            Condition::LowBand => Some(Band::High),
            Condition::HighBand => Some(Band::Low),
        }
    }

    /// Short upper-case tag used in output names
    pub fn label(&self) -> &'static str {
        match self {
            Condition::Overall => "OAG",
            Condition::LowBand => "LFG",
            Condition::HighBand => "HFG",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `{direction}_{CONDITION}_{seconds}`, e.g. `decrease_LFG_1`
pub fn output_name(direction: Direction, condition: Condition, transition_secs: f64) -> String {
    format!("{}_{}_{}", direction, condition.label(), transition_secs)
}

/// One rendered stimulus
#[derive(Debug, Clone)]
pub struct ConditionOutput {
    pub condition: Condition,
    pub transition_secs: f64,
    pub name: String,
    pub result: TransitionResult,
}

/// Render every configured (duration, condition) pair from `signal`
///
/// Band splitting happens once per duration; the conditions for that
/// duration share the split.
pub fn run_conditions(signal: &AudioBuffer, config: &FaderConfig) -> Result<Vec<ConditionOutput>> {
    config.validate()?;

    let engines = config
        .transition_durations
        .par_iter()
        .map(|&secs| -> Result<(f64, TransitionEngine)> {
            let spec = config.transition_spec(signal.sample_rate(), secs)?;
            let engine = TransitionEngine::with_band_split(signal, spec, config.band_split)?;
            Ok((secs, engine))
        })
        .collect::<Result<Vec<_>>>()?;

    let jobs: Vec<(f64, &TransitionEngine, Condition)> = engines
        .iter()
        .flat_map(|(secs, engine)| {
            config
                .conditions
                .iter()
                .map(move |&condition| (*secs, engine, condition))
        })
        .collect();

    jobs.into_par_iter()
        .map(|(secs, engine, condition)| -> Result<ConditionOutput> {
            info!("Running {} ({} s transition)", condition, secs);
            let result = engine.run(condition.change_band(), condition.stable_band())?;
            Ok(ConditionOutput {
                condition,
                transition_secs: secs,
                name: output_name(config.direction, condition, secs),
                result,
            })
        })
        .collect()
}

/// Hand each final signal to `sink` under its output name
pub fn write_outputs(outputs: &[ConditionOutput], sink: &mut dyn AudioSink) -> Result<()> {
    for output in outputs {
        sink.accept(&output.name, &output.result.final_with_direct_path)?;
    }
    Ok(())
}
