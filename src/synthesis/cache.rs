use super::SynthesisError;
use crate::lock::lock_or_recover;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::f32::consts::TAU;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Turns reply text into WAV bytes.
pub trait SpeechGenerator: Send + Sync {
    fn generate(
        &self,
        text: &str,
        speaker: &str,
        sample_rate: u32,
    ) -> Result<Vec<u8>, SynthesisError>;
}

/// Hex SHA-256 of the text; names both the memory entry and `<key>.wav` on disk.
pub fn cache_key(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Content-addressed cache in front of a generator.
pub struct CachedGenerator<G> {
    inner: G,
    memory: Mutex<HashMap<String, Arc<Vec<u8>>>>,
    dir: Option<PathBuf>,
}

impl<G: SpeechGenerator> CachedGenerator<G> {
    pub fn new(inner: G, dir: Option<PathBuf>) -> Self {
        Self {
            inner,
            memory: Mutex::new(HashMap::new()),
            dir,
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    /// Audio for `text`, plus whether it came from the cache.
    pub fn get_or_generate(
        &self,
        text: &str,
        speaker: &str,
        sample_rate: u32,
    ) -> Result<(Arc<Vec<u8>>, bool), SynthesisError> {
        let key = cache_key(text);
        if let Some(audio) = lock_or_recover(&self.memory, "synthesis cache").get(&key) {
            return Ok((Arc::clone(audio), true));
        }
        if let Some(audio) = self.read_disk(&key) {
            let audio = Arc::new(audio);
            self.remember(key, Arc::clone(&audio));
            return Ok((audio, true));
        }

        let audio = self.inner.generate(text, speaker, sample_rate)?;
        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }
        self.write_disk(&key, &audio);
        let audio = Arc::new(audio);
        self.remember(key, Arc::clone(&audio));
        Ok((audio, false))
    }

    fn remember(&self, key: String, audio: Arc<Vec<u8>>) {
        lock_or_recover(&self.memory, "synthesis cache").insert(key, audio);
    }

    fn disk_path(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(format!("{key}.wav")))
    }

    fn read_disk(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.disk_path(key)?;
        match fs::read(&path) {
            Ok(audio) if !audio.is_empty() => Some(audio),
            Ok(_) => None,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to read cached audio");
                None
            }
        }
    }

    fn write_disk(&self, key: &str, audio: &[u8]) {
        let Some(path) = self.disk_path(key) else {
            return;
        };
        if let Err(err) = write_atomically(&path, audio) {
            tracing::warn!(path = %path.display(), %err, "failed to store cached audio");
        }
    }
}

fn write_atomically(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("wav.tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)
}

/// Offline stand-in for a neural voice: a short sine tone whose length
/// follows the text, so playback timing still behaves like speech.
pub struct ToneGenerator {
    pub frequency_hz: f32,
    pub per_char_ms: u32,
    pub max_ms: u32,
}

impl Default for ToneGenerator {
    fn default() -> Self {
        Self {
            frequency_hz: 440.0,
            per_char_ms: 40,
            max_ms: 3_000,
        }
    }
}

impl SpeechGenerator for ToneGenerator {
    fn generate(
        &self,
        text: &str,
        _speaker: &str,
        sample_rate: u32,
    ) -> Result<Vec<u8>, SynthesisError> {
        let chars = text.chars().count().max(1) as u32;
        let duration_ms = chars.saturating_mul(self.per_char_ms).min(self.max_ms);
        let total = (sample_rate as u64 * duration_ms as u64 / 1_000) as usize;
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|err| SynthesisError::Generation(err.to_string()))?;
            for idx in 0..total {
                let t = idx as f32 / sample_rate as f32;
                let sample = (TAU * self.frequency_hz * t).sin() * 0.25;
                writer
                    .write_sample((sample * i16::MAX as f32) as i16)
                    .map_err(|err| SynthesisError::Generation(err.to_string()))?;
            }
            writer
                .finalize()
                .map_err(|err| SynthesisError::Generation(err.to_string()))?;
        }
        Ok(cursor.into_inner())
    }
}
