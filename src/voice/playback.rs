//! Non-blocking reply playback.

use crate::lock::lock_or_recover;
use crate::mood::{DisplayFeedback, MoodIcon};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const PLAYBACK_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("audio output unavailable: {0}")]
    Device(String),
    #[error("reply audio could not be decoded: {0}")]
    Decode(String),
}

/// Plays one clip to completion on the calling thread, returning early once
/// `cancel` is set.
pub trait PlaybackBackend: Send + Sync {
    fn play(&self, audio: &[u8], cancel: &AtomicBool) -> Result<(), PlaybackError>;

    fn name(&self) -> &'static str;
}

/// Default output device through rodio.
#[cfg(feature = "playback")]
pub struct RodioBackend;

#[cfg(feature = "playback")]
impl PlaybackBackend for RodioBackend {
    fn play(&self, audio: &[u8], cancel: &AtomicBool) -> Result<(), PlaybackError> {
        // The output stream is not Send, so it lives only on this worker.
        let (_stream, handle) = rodio::OutputStream::try_default()
            .map_err(|err| PlaybackError::Device(err.to_string()))?;
        let sink =
            rodio::Sink::try_new(&handle).map_err(|err| PlaybackError::Device(err.to_string()))?;
        let source = rodio::Decoder::new(Cursor::new(audio.to_vec()))
            .map_err(|err| PlaybackError::Decode(err.to_string()))?;
        sink.append(source);
        while !sink.empty() {
            if cancel.load(Ordering::SeqCst) {
                sink.stop();
                break;
            }
            thread::sleep(PLAYBACK_POLL);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "rodio"
    }
}

/// No output device: checks the clip is a WAV and waits out its length, so
/// the rest of the pipeline sees realistic timing.
pub struct SilentBackend;

impl PlaybackBackend for SilentBackend {
    fn play(&self, audio: &[u8], cancel: &AtomicBool) -> Result<(), PlaybackError> {
        let reader = hound::WavReader::new(Cursor::new(audio))
            .map_err(|err| PlaybackError::Decode(err.to_string()))?;
        let spec = reader.spec();
        let frames = reader.duration() as u64;
        let length = Duration::from_millis(frames * 1_000 / spec.sample_rate.max(1) as u64);
        let deadline = Instant::now() + length;
        while Instant::now() < deadline {
            if cancel.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(PLAYBACK_POLL.min(deadline.saturating_duration_since(Instant::now())));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "silent"
    }
}

/// Backend picked by the build: rodio when the `playback` feature is on.
pub fn default_backend() -> Arc<dyn PlaybackBackend> {
    #[cfg(feature = "playback")]
    {
        Arc::new(RodioBackend)
    }
    #[cfg(not(feature = "playback"))]
    {
        Arc::new(SilentBackend)
    }
}

struct ActivePlayback {
    cancel: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
}

/// Owns the single playback slot. `play` replaces whatever is playing and
/// returns immediately; the clip runs on its own worker.
pub struct AudioPlaybackManager {
    backend: Arc<dyn PlaybackBackend>,
    display: DisplayFeedback,
    error_hold: Duration,
    active: Mutex<Option<ActivePlayback>>,
}

impl AudioPlaybackManager {
    pub fn new(
        backend: Arc<dyn PlaybackBackend>,
        display: DisplayFeedback,
        error_hold: Duration,
    ) -> Self {
        Self {
            backend,
            display,
            error_hold,
            active: Mutex::new(None),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn play(&self, audio: Vec<u8>) {
        let cancel = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));
        let previous = lock_or_recover(&self.active, "playback slot").replace(ActivePlayback {
            cancel: Arc::clone(&cancel),
            done: Arc::clone(&done),
        });
        if let Some(previous) = previous {
            previous.cancel.store(true, Ordering::SeqCst);
        }

        let backend = Arc::clone(&self.backend);
        let display = self.display.clone();
        let error_hold = self.error_hold;
        thread::spawn(move || {
            tracing::debug!(bytes = audio.len(), backend = backend.name(), "playback started");
            match backend.play(&audio, &cancel) {
                Ok(()) => tracing::debug!("playback finished"),
                Err(err) if !cancel.load(Ordering::SeqCst) => {
                    tracing::warn!(%err, "playback failed");
                    display.show(MoodIcon::Error);
                    thread::sleep(error_hold);
                    display.show(MoodIcon::Common);
                }
                Err(_) => {}
            }
            done.store(true, Ordering::SeqCst);
        });
    }

    pub fn is_busy(&self) -> bool {
        lock_or_recover(&self.active, "playback slot")
            .as_ref()
            .is_some_and(|active| !active.done.load(Ordering::SeqCst))
    }

    /// Cancel the current clip, if any. Safe to call in any state.
    pub fn stop(&self) {
        if let Some(active) = lock_or_recover(&self.active, "playback slot").take() {
            active.cancel.store(true, Ordering::SeqCst);
            tracing::debug!("playback stopped");
        }
    }
}
