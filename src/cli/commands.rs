//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::FaderConfig;
use crate::controller::{run_conditions, write_outputs, Condition};
use crate::dsp::normalize::{set_rms, ChannelBalance};
use crate::engine::io::{export_audio, import_audio, DecodedAudio};
use crate::error::{FadeError, Result};
use crate::sink::WavFileSink;

/// Load every input and sum them over the first input's length
fn load_mix(inputs: &[PathBuf]) -> Result<DecodedAudio> {
    let (first, rest) = inputs
        .split_first()
        .ok_or_else(|| FadeError::config("at least one input file is required"))?;
    let mut mix = import_audio(first)?;
    for path in rest {
        let other = import_audio(path)?;
        if other.source != mix.source {
            warn!(
                "{} is {:?}, output keeps {:?}",
                path.display(),
                other.source,
                mix.source
            );
        }
        mix.buffer = mix.buffer.mix_truncated(&other.buffer)?;
    }
    Ok(mix)
}

/// Render fade stimuli for each configured condition.
pub fn fade(
    inputs: &[PathBuf],
    out_dir: &Path,
    config_path: Option<&Path>,
    conditions: &[Condition],
    normalize: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => FaderConfig::load(path)?,
        None => FaderConfig::default(),
    };
    if !conditions.is_empty() {
        config.conditions = conditions.to_vec();
    }

    let mix = load_mix(inputs)?;
    info!(
        "Source: {} samples at {} Hz, {:.2} dB RMS",
        mix.buffer.len(),
        mix.buffer.sample_rate(),
        mix.buffer.rms_db()?
    );

    let outputs = run_conditions(&mix.buffer, &config)?;

    println!("{:-<70}", "");
    for output in &outputs {
        let result = &output.result;
        println!("{}", output.name);
        println!("  Original RMS: {:.2} dB", result.original_rms_db);
        println!("  HA RMS: {:.2} dB", result.ha_rms_db);
        if let Some(direct_db) = result.direct_rms_db {
            println!("  Direct path RMS: {:.2} dB", direct_db);
        }
        if let Some(drop) = result.drop {
            println!("  HA RMS drop: {:.2} dB", drop.gated_drop_db());
            println!("  Final RMS drop: {:.2} dB", drop.final_drop_db());
        }
    }
    println!("{:-<70}", "");

    let mut sink = WavFileSink::new(out_dir, mix.source)?.with_peak_normalization(normalize);
    write_outputs(&outputs, &mut sink)?;
    println!("Wrote {} files to {}", sink.written().len(), out_dir.display());

    Ok(())
}

/// Print per-channel RMS and ILD.
pub fn measure(path: &Path) -> Result<()> {
    let decoded = import_audio(path)?;
    let buffer = &decoded.buffer;

    println!("{}", path.display());
    println!(
        "  {} Hz, {} channel(s), {:.3} s, {:?}",
        buffer.sample_rate(),
        buffer.channels(),
        buffer.duration_secs(),
        decoded.source
    );
    for ch in 0..buffer.channels() {
        println!("  Channel {} RMS: {:.2} dB", ch, buffer.channel_rms_db(ch)?);
    }
    if buffer.channels() == 2 {
        let ild = buffer.channel_rms_db(0)? - buffer.channel_rms_db(1)?;
        println!("  ILD (L - R): {:.2} dB", ild);
    }
    println!("  Overall RMS: {:.2} dB", buffer.rms_db()?);
    println!("  Peak: {:.4}", buffer.peak());

    Ok(())
}

/// Scale a file to a target RMS level, keeping its format.
pub fn set_level(input: &Path, output: &Path, level_db: f64, equalize: bool) -> Result<()> {
    info!("Setting {} to {:.2} dB", input.display(), level_db);

    let decoded = import_audio(input)?;
    let balance = if equalize {
        ChannelBalance::Equalize
    } else {
        ChannelBalance::PreserveIld
    };
    let leveled = set_rms(&decoded.buffer, level_db, balance)?;
    if leveled.peak() > 1.0 && !decoded.source.is_float() {
        warn!(
            "Peak {:.3} exceeds full scale; samples will clip in {:?}",
            leveled.peak(),
            decoded.source
        );
    }
    export_audio(&leveled, output, decoded.source)?;

    println!("Wrote {} ({:.2} dB)", output.display(), leveled.rms_db()?);
    Ok(())
}

/// Write the default config.
pub fn init_config(path: &Path) -> Result<()> {
    FaderConfig::default().save(path)?;
    println!("Config written: {}", path.display());
    Ok(())
}
