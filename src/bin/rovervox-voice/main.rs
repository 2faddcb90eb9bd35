//! Voice assistant entrypoint: listens for the wake phrase, waves the robot
//! around to acknowledge it, and answers one spoken command per wake.
//!
//! Utterances arrive one per line on stdin, so any recognizer that prints
//! transcripts can be piped in.
//!
//! # Architecture
//!
//! - Listener thread: routes utterances to the wake and command queues
//! - Pipeline (main thread): wake, gesture, command capture
//! - Response workers: synthesis and playback, one per command

use anyhow::{bail, Context, Result};
use rovervox::config::VoiceConfig;
use rovervox::control::{install_shutdown_handler, shutdown_requested, SignalSender};
use rovervox::logging::{init_logging, install_panic_hook};
use rovervox::mood::DisplayFeedback;
use rovervox::runtime::{RunFlag, MAX_SLEEP_SLICE};
use rovervox::synthesis::{
    CachedGenerator, ConversationService, EchoReplies, HttpSynthesisClient, ResponseSynthesizer,
    ToneGenerator,
};
use rovervox::voice::{
    default_backend, spawn_listener, AudioPlaybackManager, GestureOutcome, GestureSequencer,
    LineRecognizer, UtteranceStream, VoiceContext, VoicePipeline, VoiceQueues, WakePhrases,
};
use std::io::{self, BufReader};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    let config = VoiceConfig::parse_args()?;
    init_logging("voice", &config.log);
    install_panic_hook();
    install_shutdown_handler().context("failed to install shutdown handlers")?;

    let synthesizer = build_synthesizer(&config)?;
    let sender = SignalSender::new(config.robot_pid);
    match config.robot_pid {
        Some(pid) if !sender.target_alive() => {
            tracing::warn!(pid, "robot process not found; gestures will be skipped")
        }
        Some(pid) => tracing::info!(pid, "controlling robot"),
        None => tracing::warn!("no robot pid given; running without gestures"),
    }

    let run = RunFlag::new();
    let timings = config.pipeline_timings();
    let display = DisplayFeedback::from_mood_file(config.mood_file.as_deref());
    let context = VoiceContext::new(timings.wake_cooldown);
    let gestures = Arc::new(GestureSequencer::new(
        Arc::new(sender),
        display.clone(),
        context.clone(),
        config.gesture_timings(),
        run.clone(),
    ));
    let playback = Arc::new(AudioPlaybackManager::new(
        default_backend(),
        display.clone(),
        timings.playback_error_hold,
    ));
    tracing::info!(
        backend = playback.backend_name(),
        wake_phrases = ?config.wake_phrases,
        "voice assistant starting"
    );

    let queues = VoiceQueues::new(&timings);
    let utterances = UtteranceStream::new(
        LineRecognizer::new(BufReader::new(io::stdin())),
        run.clone(),
        timings.recognizer_backoff,
    );
    // Blocked on stdin most of the time, so it is never joined.
    let _listener = spawn_listener(
        utterances,
        WakePhrases::new(&config.wake_phrases),
        context.clone(),
        queues.wake_tx,
        queues.command_tx,
    );
    let watcher = spawn_shutdown_watcher(run.clone(), MAX_SLEEP_SLICE);

    let mut pipeline = VoicePipeline::new(
        context,
        Arc::clone(&gestures),
        synthesizer,
        playback,
        display,
        timings,
        run.clone(),
        queues.wake_rx,
        queues.command_rx,
    );
    pipeline.run();

    run.stop();
    if gestures.release() == GestureOutcome::Aborted {
        tracing::warn!("robot may still be in manual mode");
    }
    if watcher.join().is_err() {
        tracing::warn!("shutdown watcher panicked");
    }
    tracing::info!("voice assistant stopped");
    Ok(())
}

fn build_synthesizer(config: &VoiceConfig) -> Result<Arc<dyn ResponseSynthesizer>> {
    if config.offline {
        tracing::info!(cache_dir = ?config.cache_dir, "offline synthesis: echoing commands");
        let voice = CachedGenerator::new(ToneGenerator::default(), config.cache_dir.clone());
        return Ok(Arc::new(ConversationService::new(
            EchoReplies,
            voice,
            &config.speaker,
            config.tts_sample_rate,
        )));
    }

    let client = HttpSynthesisClient::new(
        &config.server_url,
        &config.speaker,
        config.tts_sample_rate,
        Duration::from_millis(config.synthesis_timeout_ms),
        Duration::from_millis(config.health_timeout_ms),
    );
    if config.skip_health_check {
        tracing::info!(server = client.base_url(), "synthesis health check skipped");
    } else {
        let health = client
            .health()
            .with_context(|| format!("synthesis service at {} is unreachable", client.base_url()))?;
        if !health.is_ready() {
            bail!(
                "synthesis service at {} is not ready (status '{}', model loaded: {})",
                client.base_url(),
                health.status,
                health.model_loaded
            );
        }
        tracing::info!(server = client.base_url(), "synthesis service ready");
    }
    Ok(Arc::new(client))
}

/// Turn SIGINT/SIGTERM into a cleared run flag.
fn spawn_shutdown_watcher(run: RunFlag, poll: Duration) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while run.sleep(poll) {
            if shutdown_requested() {
                tracing::info!("shutdown signal received");
                run.stop();
            }
        }
    })
}
