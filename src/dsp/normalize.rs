//! Level Normalizer
//!
//! Scales mono or stereo buffers to a target RMS level. For stereo input the
//! interaural level difference (ILD) is kept by default: both channels are
//! first leveled to the target independently, then half the original ILD is
//! re-applied in opposite directions so the louder side stays louder.

use log::debug;

use crate::dsp::level::{db2mag, mag2db, rms};
use crate::engine::AudioBuffer;
use crate::error::{FadeError, Result};

/// Levels closer than this are treated as equal
///
/// Levels come out of `log10`, so exact float equality almost never holds.
pub const LEVEL_EPSILON_DB: f64 = 1e-9;

/// How a two-channel buffer's level difference is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelBalance {
    /// Keep the left/right level difference around the target level
    #[default]
    PreserveIld,
    /// Level both channels to the target (ILD collapses to 0 dB)
    Equalize,
}

/// Which channel of a stereo pair is louder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelAdvantage {
    Left,
    Right,
}

/// Scale one channel from `current_db` to `target_db`
fn level_channel(samples: &[f64], current_db: f64, target_db: f64) -> Vec<f64> {
    let diff_db = (current_db - target_db).abs();
    if diff_db < LEVEL_EPSILON_DB {
        samples.to_vec()
    } else if current_db > target_db {
        let gain = db2mag(diff_db);
        samples.iter().map(|s| s / gain).collect()
    } else {
        let gain = db2mag(diff_db);
        samples.iter().map(|s| s * gain).collect()
    }
}

/// Set the RMS level of a mono or stereo buffer
///
/// The target applies per channel, not to the sum of both channels.
///
/// # Errors
/// * `EmptyBuffer` - the buffer has no samples
/// * `NonPositiveMagnitude` - a channel is silent, so it has no level to scale
pub fn set_rms(buffer: &AudioBuffer, target_db: f64, balance: ChannelBalance) -> Result<AudioBuffer> {
    match buffer.channels() {
        1 => {
            let samples = buffer.channel(0);
            let current_db = mag2db(rms(samples)?)?;
            debug!("Mono level {:.2} dB -> {:.2} dB", current_db, target_db);
            Ok(AudioBuffer::mono(
                level_channel(samples, current_db, target_db),
                buffer.sample_rate(),
            ))
        }
        2 => set_rms_stereo(buffer, target_db, balance),
        n => Err(FadeError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", n),
        }),
    }
}

fn set_rms_stereo(
    buffer: &AudioBuffer,
    target_db: f64,
    balance: ChannelBalance,
) -> Result<AudioBuffer> {
    let left = buffer.channel(0);
    let right = buffer.channel(1);
    let left_db = mag2db(rms(left)?)?;
    let right_db = mag2db(rms(right)?)?;

    let ild = (left_db - right_db).abs();
    let advantage = if ild < LEVEL_EPSILON_DB {
        None
    } else if left_db > right_db {
        Some(LevelAdvantage::Left)
    } else {
        Some(LevelAdvantage::Right)
    };
    debug!(
        "Stereo levels L {:.2} dB / R {:.2} dB (ILD {:.2} dB) -> {:.2} dB",
        left_db, right_db, ild, target_db
    );

    let mut adj_left = level_channel(left, left_db, target_db);
    let mut adj_right = level_channel(right, right_db, target_db);

    if let (ChannelBalance::PreserveIld, Some(advantage)) = (balance, advantage) {
        let half = db2mag(ild / 2.0);
        let (louder, quieter) = match advantage {
            LevelAdvantage::Left => (&mut adj_left, &mut adj_right),
            LevelAdvantage::Right => (&mut adj_right, &mut adj_left),
        };
        louder.iter_mut().for_each(|s| *s *= half);
        quieter.iter_mut().for_each(|s| *s /= half);
    }

    AudioBuffer::stereo(adj_left, adj_right, buffer.sample_rate())
}

/// Scale a buffer so its largest absolute sample is 1.0
///
/// An all-zero buffer is returned unchanged.
///
/// # Errors
/// `EmptyBuffer` if the buffer has no samples
pub fn normalize_peak(buffer: &AudioBuffer) -> Result<AudioBuffer> {
    if buffer.is_empty() {
        return Err(FadeError::EmptyBuffer);
    }
    let peak = buffer.peak();
    if peak == 0.0 {
        return Ok(buffer.clone());
    }
    Ok(buffer.scaled(1.0 / peak))
}
