//! The voice process's main loop: wait for the wake phrase, acknowledge it
//! with a gesture, capture one command, answer it, hand the robot back.

use super::capture::WakeEvent;
use super::gesture::{animate_wake_eyes, GestureOutcome, GestureSequencer};
use super::playback::AudioPlaybackManager;
use super::session::{VoiceContext, VoicePhase};
use crate::mood::{DisplayFeedback, MoodIcon};
use crate::runtime::{RunFlag, MAX_SLEEP_SLICE};
use crate::synthesis::ResponseSynthesizer;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const PLAYBACK_WATCH_POLL: Duration = Duration::from_millis(50);

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PipelineTimings {
    pub wake_cooldown: Duration,
    pub command_timeout: Duration,
    pub return_delay: Duration,
    /// How long the error face stays up after a hard synthesis failure.
    pub error_hold: Duration,
    pub idle_poll: Duration,
    pub idle_mood_chance: f64,
    pub recognizer_backoff: Duration,
    pub speaking_face_delay: Duration,
    pub playback_error_hold: Duration,
    pub command_queue_capacity: usize,
    pub wake_queue_capacity: usize,
}

/// Bounded queues between the speech listener and the pipeline.
pub struct VoiceQueues {
    pub wake_tx: Sender<WakeEvent>,
    pub wake_rx: Receiver<WakeEvent>,
    pub command_tx: Sender<String>,
    pub command_rx: Receiver<String>,
}

impl VoiceQueues {
    pub fn new(timings: &PipelineTimings) -> Self {
        let (wake_tx, wake_rx) = crossbeam_channel::bounded(timings.wake_queue_capacity);
        let (command_tx, command_rx) = crossbeam_channel::bounded(timings.command_queue_capacity);
        Self {
            wake_tx,
            wake_rx,
            command_tx,
            command_rx,
        }
    }
}

/// Wait up to `timeout` for the first queued command. Wakes at least every
/// `MAX_SLEEP_SLICE` to notice shutdown.
pub fn await_command(rx: &Receiver<String>, timeout: Duration, run: &RunFlag) -> Option<String> {
    let deadline = Instant::now() + timeout;
    loop {
        if !run.is_running() {
            return None;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return None;
        }
        match rx.recv_timeout(remaining.min(MAX_SLEEP_SLICE)) {
            Ok(command) => return Some(command),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

/// Answers one command on its own worker so the pipeline keeps polling.
struct ResponseHandler {
    context: VoiceContext,
    gestures: Arc<GestureSequencer>,
    synthesizer: Arc<dyn ResponseSynthesizer>,
    playback: Arc<AudioPlaybackManager>,
    display: DisplayFeedback,
    timings: PipelineTimings,
    run: RunFlag,
}

impl ResponseHandler {
    fn handle(&self, command: &str) {
        self.display.show(MoodIcon::Rolled);
        let started = Instant::now();
        let mut eyes = None;
        match self.synthesizer.synthesize(command) {
            Ok(response) => {
                tracing::info!(
                    reply = %response.response_text,
                    is_error = response.is_error,
                    status = %response.status_message,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "reply synthesized"
                );
                let is_error = response.is_error;
                self.playback.play(response.audio_bytes);
                self.display
                    .show(if is_error { MoodIcon::Error } else { MoodIcon::Happy });
                eyes = Some(self.spawn_playback_eyes(is_error));
            }
            Err(err) => {
                tracing::warn!(%err, transient = err.is_transient(), "synthesis failed");
                self.display.show(MoodIcon::Error);
                self.run.sleep(self.timings.error_hold);
                self.display.show(MoodIcon::Common);
            }
        }

        self.run.sleep(self.timings.return_delay);
        if let Some((cancel, handle)) = eyes {
            cancel.stop();
            if handle.join().is_err() {
                tracing::warn!("playback eye animation panicked");
            }
        }
        self.gestures.return_to_auto();
        self.context.set_phase(VoicePhase::WaitingForWake);
        self.display.show(MoodIcon::Closed);
        tracing::info!("waiting for wake phrase");
    }

    /// Speaking face after a short delay, resting face once playback ends.
    /// Stops as soon as `cancel` or the process run flag is cleared.
    fn spawn_playback_eyes(&self, is_error: bool) -> (RunFlag, JoinHandle<()>) {
        let cancel = RunFlag::new();
        let local = cancel.clone();
        let run = self.run.clone();
        let playback = Arc::clone(&self.playback);
        let display = self.display.clone();
        let delay = self.timings.speaking_face_delay;
        let handle = thread::spawn(move || {
            let live = || local.is_running() && run.is_running();
            if !local.sleep(delay) || !live() {
                return;
            }
            if !is_error && playback.is_busy() {
                display.show(MoodIcon::Flinch);
            }
            while playback.is_busy() {
                if !live() {
                    return;
                }
                thread::sleep(PLAYBACK_WATCH_POLL);
            }
            display.show(MoodIcon::Common);
        });
        (cancel, handle)
    }
}

pub struct VoicePipeline {
    handler: Arc<ResponseHandler>,
    wake_rx: Receiver<WakeEvent>,
    command_rx: Receiver<String>,
    rng: StdRng,
    inflight: Option<JoinHandle<()>>,
}

impl VoicePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: VoiceContext,
        gestures: Arc<GestureSequencer>,
        synthesizer: Arc<dyn ResponseSynthesizer>,
        playback: Arc<AudioPlaybackManager>,
        display: DisplayFeedback,
        timings: PipelineTimings,
        run: RunFlag,
        wake_rx: Receiver<WakeEvent>,
        command_rx: Receiver<String>,
    ) -> Self {
        Self {
            handler: Arc::new(ResponseHandler {
                context,
                gestures,
                synthesizer,
                playback,
                display,
                timings,
                run,
            }),
            wake_rx,
            command_rx,
            rng: StdRng::from_entropy(),
            inflight: None,
        }
    }

    /// Fixed idle-mood sequence for tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Run until shutdown or until the speech source closes. A reply that is
    /// still in flight when the source closes is allowed to finish.
    pub fn run(&mut self) {
        let handler = Arc::clone(&self.handler);
        handler.display.show(MoodIcon::Closed);
        tracing::info!("waiting for wake phrase");
        while handler.run.is_running() {
            match self.wake_rx.recv_timeout(handler.timings.idle_poll) {
                Ok(event) => self.on_wake(event),
                Err(RecvTimeoutError::Timeout) => self.idle_tick(),
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("speech listener finished");
                    break;
                }
            }
        }
        if let Some(handle) = self.inflight.take() {
            if handle.join().is_err() {
                tracing::warn!("response worker panicked");
            }
        }
        handler.playback.stop();
        tracing::info!("voice pipeline stopped");
    }

    fn on_wake(&mut self, event: WakeEvent) {
        let handler = Arc::clone(&self.handler);
        if let Some(previous) = self.inflight.take() {
            if previous.join().is_err() {
                tracing::warn!("response worker panicked");
            }
        }
        tracing::info!(text = %event.text, "wake phrase accepted");
        handler.context.set_phase(VoicePhase::ListeningCommand);

        let eyes = animate_wake_eyes(handler.display.clone(), handler.gestures.timings().eye_frame);
        let outcome = handler.gestures.perform_wake_gesture();
        if eyes.join().is_err() {
            tracing::warn!("wake eye animation panicked");
        }
        if outcome == GestureOutcome::Aborted && !handler.run.is_running() {
            handler.context.set_phase(VoicePhase::WaitingForWake);
            return;
        }

        let stale = self.command_rx.try_iter().count();
        if stale > 0 {
            tracing::debug!(stale, "dropped commands heard during the gesture");
        }
        handler.display.show(MoodIcon::Irritate);
        tracing::info!(
            timeout_ms = handler.timings.command_timeout.as_millis() as u64,
            "listening for command"
        );

        match await_command(&self.command_rx, handler.timings.command_timeout, &handler.run) {
            Some(command) => {
                handler.context.set_phase(VoicePhase::ProcessingResponse);
                let worker = Arc::clone(&handler);
                self.inflight = Some(thread::spawn(move || worker.handle(&command)));
            }
            None => {
                tracing::info!("no command heard");
                handler.gestures.return_to_auto();
                handler.context.set_phase(VoicePhase::WaitingForWake);
                handler.display.show(MoodIcon::Closed);
            }
        }
    }

    fn idle_tick(&mut self) {
        let handler = &self.handler;
        if handler.context.phase() != VoicePhase::WaitingForWake {
            return;
        }
        if self.rng.gen::<f64>() < handler.timings.idle_mood_chance {
            if let Some(icon) = MoodIcon::IDLE_CYCLE.choose(&mut self.rng) {
                handler.display.show(*icon);
            }
        }
    }
}
