//! Audio Engine Module
//!
//! Core audio data handling:
//! - Audio buffer management
//! - File I/O operations

pub mod buffer;
pub mod io;

pub use buffer::{AudioBuffer, ChannelLayout};
pub use io::{
    export_audio, generate_stereo_test_tone, generate_test_tone, import_audio, DecodedAudio,
    SourceFormat,
};
