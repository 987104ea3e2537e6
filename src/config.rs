//! Session configuration
//!
//! A `FaderConfig` describes one batch of stimuli: which transition lengths
//! to render, which conditions to run them under, and the shared envelope,
//! direct-path and filter settings. Stored as pretty-printed JSON.

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::controller::Condition;
use crate::dsp::bands::BandSplitConfig;
use crate::dsp::envelope::{Direction, StablePlacement};
use crate::dsp::fader::{TransitionSpec, DEFAULT_DIRECT_DELAY_MS};
use crate::dsp::level::db2mag;
use crate::error::{FadeError, Result};

/// Batch configuration for the conditions controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaderConfig {
    /// Transition lengths to render, in seconds
    pub transition_durations: Vec<f64>,
    /// Stable region length in seconds
    pub stable_secs: f64,
    pub stable_placement: StablePlacement,
    /// Gain at full attenuation, in dB
    pub floor_db: f64,
    /// Direct path level below the source, in dB
    pub gain_drop_db: f64,
    pub direction: Direction,
    pub direct_path: bool,
    pub direct_delay_ms: f64,
    pub band_split: BandSplitConfig,
    pub conditions: Vec<Condition>,
}

impl Default for FaderConfig {
    fn default() -> Self {
        Self {
            transition_durations: vec![1.0],
            stable_secs: 5.0,
            stable_placement: StablePlacement::Both,
            floor_db: -10.0,
            gain_drop_db: 6.0,
            direction: Direction::Decrease,
            direct_path: true,
            direct_delay_ms: DEFAULT_DIRECT_DELAY_MS,
            band_split: BandSplitConfig::default(),
            conditions: vec![Condition::Overall, Condition::LowBand, Condition::HighBand],
        }
    }
}

impl FaderConfig {
    /// Load and validate a config file
    ///
    /// # Errors
    /// * `FileNotFound` - no file at `path`
    /// * `Serialization` - malformed JSON or an unknown enum string
    /// * `InvalidConfig` - values out of range
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FadeError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        let config: FaderConfig = serde_json::from_str(&content)?;
        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check the batch-level settings
    ///
    /// Per-transition checks happen in [`TransitionSpec::validate`].
    pub fn validate(&self) -> Result<()> {
        if self.transition_durations.is_empty() {
            return Err(FadeError::config("at least one transition duration is required"));
        }
        if let Some(bad) = self
            .transition_durations
            .iter()
            .find(|d| !(d.is_finite() && **d > 0.0))
        {
            return Err(FadeError::config(format!(
                "transition durations must be positive, got {}",
                bad
            )));
        }
        if self.conditions.is_empty() {
            return Err(FadeError::config("at least one condition is required"));
        }
        if !(self.floor_db.is_finite() && self.floor_db <= 0.0) {
            return Err(FadeError::config(format!(
                "floor must be at or below 0 dB, got {}",
                self.floor_db
            )));
        }
        Ok(())
    }

    /// Build and validate the `TransitionSpec` for one transition length
    pub fn transition_spec(&self, sample_rate: u32, transition_secs: f64) -> Result<TransitionSpec> {
        let spec = TransitionSpec {
            sample_rate,
            transition_secs,
            stable_secs: self.stable_secs,
            stable_placement: self.stable_placement,
            floor_magnitude: db2mag(self.floor_db),
            gain_drop_db: self.gain_drop_db,
            direction: self.direction,
            direct_path: self.direct_path,
            direct_delay_ms: self.direct_delay_ms,
        };
        spec.validate()?;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_default_round_trips_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fader.json");
        let config = FaderConfig::default();
        config.save(&path).unwrap();

        let loaded = FaderConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: FaderConfig = serde_json::from_str(
            r#"{ "transition_durations": [0.5, 2.0], "direction": "increase", "conditions": ["lfg"] }"#,
        )
        .unwrap();
        assert_eq!(config.transition_durations, vec![0.5, 2.0]);
        assert_eq!(config.direction, Direction::Increase);
        assert_eq!(config.conditions, vec![Condition::LowBand]);
        assert_eq!(config.stable_secs, 5.0);
        assert_eq!(config.band_split, BandSplitConfig::default());
    }

    #[test]
    fn test_end_placement_rejected_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "stable_placement": "end" }"#).unwrap();
        assert!(matches!(
            FaderConfig::load(&path),
            Err(FadeError::Serialization(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_batches() {
        let config = FaderConfig {
            transition_durations: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(FadeError::InvalidConfig { .. })));

        let config = FaderConfig {
            conditions: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = FaderConfig {
            transition_durations: vec![1.0, 0.0],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transition_spec_from_config() {
        let spec = FaderConfig::default().transition_spec(48000, 2.0).unwrap();
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.transition_secs, 2.0);
        assert_abs_diff_eq!(spec.floor_magnitude, 0.316_227_766, epsilon = 1e-9);
        assert_eq!(spec.delay_samples(), 240);
        assert_eq!(spec.segment_plan().total(), 12 * 48000);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            FaderConfig::load(Path::new("/nonexistent/fader.json")),
            Err(FadeError::FileNotFound { .. })
        ));
    }
}
