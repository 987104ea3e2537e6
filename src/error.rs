//! Error handling for Bandfade
//!
//! Every error carries enough context for the caller to recover: domain
//! errors name the offending value, duration errors name both sample counts.

use thiserror::Error;

/// Result type alias for Bandfade operations
pub type Result<T> = std::result::Result<T, FadeError>;

/// Main error type for Bandfade operations
#[derive(Error, Debug)]
pub enum FadeError {
    // Domain Errors
    #[error("Cannot measure level of an empty buffer")]
    EmptyBuffer,

    #[error("Magnitude must be positive to convert to dB, got {value}")]
    NonPositiveMagnitude { value: f64 },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Channel count mismatch: expected {expected}, found {found}")]
    ChannelMismatch { expected: usize, found: usize },

    #[error("Sample rate mismatch: expected {expected} Hz, found {found} Hz")]
    SampleRateMismatch { expected: u32, found: u32 },

    // Duration Errors
    #[error("Insufficient input duration: {required} samples required, {available} available")]
    InsufficientDuration { required: usize, available: usize },

    // File Errors
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FadeError {
    /// Shorthand for an `InvalidConfig` error
    pub fn config(reason: impl Into<String>) -> Self {
        FadeError::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            FadeError::EmptyBuffer => "EMPTY_BUFFER",
            FadeError::NonPositiveMagnitude { .. } => "NON_POSITIVE_MAGNITUDE",
            FadeError::InvalidConfig { .. } => "INVALID_CONFIG",
            FadeError::ChannelMismatch { .. } => "CHANNEL_MISMATCH",
            FadeError::SampleRateMismatch { .. } => "SAMPLE_RATE_MISMATCH",
            FadeError::InsufficientDuration { .. } => "INSUFFICIENT_DURATION",
            FadeError::FileNotFound { .. } => "FILE_NOT_FOUND",
            FadeError::InvalidAudio { .. } => "INVALID_AUDIO",
            FadeError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            FadeError::Io(_) => "IO_ERROR",
            FadeError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can recover by changing its inputs
    ///
    /// Processing is deterministic, so retrying with the same inputs never helps.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FadeError::InsufficientDuration { .. }
                | FadeError::FileNotFound { .. }
                | FadeError::InvalidAudio { .. }
                | FadeError::UnsupportedFormat { .. }
                | FadeError::InvalidConfig { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            FadeError::InsufficientDuration { .. } => vec![
                "Choose a shorter transition or stable duration",
                "Supply a longer source recording",
            ],
            FadeError::InvalidConfig { .. } => vec![
                "Stable placement must be one of: both, start, none",
                "Direction must be one of: increase, decrease",
            ],
            FadeError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            FadeError::InvalidAudio { .. } => vec![
                "Check if the file plays in another application",
                "Try re-exporting the file as PCM WAV",
            ],
            FadeError::UnsupportedFormat { .. } => vec![
                "Convert to a mono or stereo WAV file",
                "Supported bit depths: 8, 16, 24, 32 (int) and 32 (float)",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = FadeError::InsufficientDuration {
            required: 144000,
            available: 48000,
        };
        assert_eq!(err.error_code(), "INSUFFICIENT_DURATION");
        assert_eq!(FadeError::EmptyBuffer.error_code(), "EMPTY_BUFFER");
    }

    #[test]
    fn test_insufficient_duration_message() {
        let err = FadeError::InsufficientDuration {
            required: 144000,
            available: 48000,
        };
        let msg = err.to_string();
        assert!(msg.contains("144000"));
        assert!(msg.contains("48000"));
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = FadeError::config("unknown stable placement 'end'");
        assert!(!err.recovery_suggestions().is_empty());
        assert!(err.is_recoverable());

        let err = FadeError::NonPositiveMagnitude { value: 0.0 };
        assert!(!err.is_recoverable());
        assert!(err.recovery_suggestions().is_empty());
    }
}
