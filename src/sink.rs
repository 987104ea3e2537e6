//! Audio sinks
//!
//! Finished stimuli are handed to an [`AudioSink`]; the engine never writes
//! files or talks to a playback device itself.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::dsp::normalize::normalize_peak;
use crate::engine::io::{export_audio, SourceFormat};
use crate::engine::AudioBuffer;
use crate::error::Result;

/// Destination for named output buffers
pub trait AudioSink {
    /// Take ownership of the result called `name`
    fn accept(&mut self, name: &str, buffer: &AudioBuffer) -> Result<()>;
}

/// Writes each buffer to `<dir>/<name>.wav`
#[derive(Debug, Clone)]
pub struct WavFileSink {
    dir: PathBuf,
    format: SourceFormat,
    normalize_peak: bool,
    written: Vec<PathBuf>,
}

impl WavFileSink {
    /// Create the sink, creating `dir` if needed
    pub fn new(dir: &Path, format: SourceFormat) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            format,
            normalize_peak: false,
            written: Vec::new(),
        })
    }

    /// Scale each buffer to unit peak before writing
    pub fn with_peak_normalization(mut self, enabled: bool) -> Self {
        self.normalize_peak = enabled;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far, in order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.wav", name))
    }
}

impl AudioSink for WavFileSink {
    fn accept(&mut self, name: &str, buffer: &AudioBuffer) -> Result<()> {
        let path = self.path_for(name);
        if self.normalize_peak {
            export_audio(&normalize_peak(buffer)?, &path, self.format)?;
        } else {
            export_audio(buffer, &path, self.format)?;
        }
        info!("Wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

/// Keeps every buffer in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Vec<(String, AudioBuffer)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[(String, AudioBuffer)] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&AudioBuffer> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, buffer)| buffer)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AudioSink for MemorySink {
    fn accept(&mut self, name: &str, buffer: &AudioBuffer) -> Result<()> {
        self.entries.push((name.to_string(), buffer.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::io::import_audio;
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    #[test]
    fn test_memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.accept("a", &AudioBuffer::mono(vec![0.1], 8000)).unwrap();
        sink.accept("b", &AudioBuffer::mono(vec![0.2], 8000)).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.entries()[0].0, "a");
        assert_eq!(sink.get("b").unwrap().channel(0), &[0.2]);
        assert!(sink.get("c").is_none());
    }

    #[test]
    fn test_wav_sink_writes_named_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested");
        let mut sink = WavFileSink::new(&out, SourceFormat::Int16).unwrap();
        sink.accept("decrease_OAG_1", &AudioBuffer::mono(vec![0.25; 100], 16000))
            .unwrap();

        let path = out.join("decrease_OAG_1.wav");
        assert_eq!(sink.written(), &[path.clone()]);
        let decoded = import_audio(&path).unwrap();
        assert_eq!(decoded.buffer.len(), 100);
        assert_abs_diff_eq!(decoded.buffer.channel(0)[0], 0.25, epsilon = 1e-4);
    }

    #[test]
    fn test_wav_sink_peak_normalization() {
        let dir = tempdir().unwrap();
        let mut sink = WavFileSink::new(dir.path(), SourceFormat::Float32)
            .unwrap()
            .with_peak_normalization(true);
        sink.accept("loud", &AudioBuffer::mono(vec![0.5, -2.0, 1.0], 16000))
            .unwrap();

        let decoded = import_audio(&dir.path().join("loud.wav")).unwrap();
        assert_eq!(decoded.buffer.channel(0), &[0.25, -1.0, 0.5]);
    }
}
