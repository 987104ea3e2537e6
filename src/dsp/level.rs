//! Level Meter
//!
//! Decibel conversions and RMS measurement. Levels are relative to a
//! magnitude-1.0 full-scale reference.

use crate::error::{FadeError, Result};

/// Convert decibels to linear magnitude
#[inline]
pub fn db2mag(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert linear magnitude to decibels
///
/// # Errors
/// `NonPositiveMagnitude` for zero, negative or NaN input
#[inline]
pub fn mag2db(mag: f64) -> Result<f64> {
    if mag > 0.0 {
        Ok(20.0 * mag.log10())
    } else {
        Err(FadeError::NonPositiveMagnitude { value: mag })
    }
}

/// Element-wise [`db2mag`]
pub fn db2mag_all(db: &[f64]) -> Vec<f64> {
    db.iter().copied().map(db2mag).collect()
}

/// Element-wise [`mag2db`]; fails on the first non-positive element
pub fn mag2db_all(mag: &[f64]) -> Result<Vec<f64>> {
    mag.iter().copied().map(mag2db).collect()
}

/// Root-mean-square of a sample sequence
///
/// # Errors
/// `EmptyBuffer` if `samples` is empty
pub fn rms(samples: &[f64]) -> Result<f64> {
    if samples.is_empty() {
        return Err(FadeError::EmptyBuffer);
    }
    let sum_squares: f64 = samples.iter().map(|s| s * s).sum();
    Ok((sum_squares / samples.len() as f64).sqrt())
}

/// RMS over several channels treated as one flat sequence
pub fn rms_multi<'a, I>(channels: I) -> Result<f64>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let (sum_squares, count) = channels
        .into_iter()
        .flat_map(|ch| ch.iter())
        .fold((0.0, 0usize), |(acc, n), s| (acc + s * s, n + 1));
    if count == 0 {
        return Err(FadeError::EmptyBuffer);
    }
    Ok((sum_squares / count as f64).sqrt())
}

/// RMS of a sample sequence in dB
pub fn rms_db(samples: &[f64]) -> Result<f64> {
    mag2db(rms(samples)?)
}

/// Round a level to hundredths of a dB
#[inline]
pub fn round_db(db: f64) -> f64 {
    (db * 100.0).round() / 100.0
}
