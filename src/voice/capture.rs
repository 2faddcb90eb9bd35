//! Speech capture seam and the background listener that feeds the pipeline.

use super::session::{VoiceContext, VoicePhase, WakeDecision};
use super::wake::WakePhrases;
use crate::runtime::RunFlag;
use crossbeam_channel::{Sender, TrySendError};
use regex::Regex;
use std::io::BufRead;
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("no speech before the listen timeout")]
    Timeout,
    #[error("speech was not understood")]
    NothingUnderstood,
    #[error("speech recognition service error: {0}")]
    Service(String),
    #[error("speech source closed")]
    Closed,
}

/// One blocking listen call per utterance.
pub trait SpeechRecognizer: Send {
    fn listen(&mut self) -> Result<String, RecognitionError>;
}

/// Trim, drop bracketed non-speech markers, collapse whitespace, lower-case.
pub fn sanitize_utterance(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    static NON_SPEECH_RE: OnceLock<Regex> = OnceLock::new();
    let re = NON_SPEECH_RE.get_or_init(|| {
        Regex::new(r"(?i)\[\s*(?:silence|noise|inaudible|music|laughter|cough|breath(?:ing)?)?\s*\]")
            .expect("non-speech regex should compile")
    });
    re.replace_all(trimmed, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Endless stream of sanitized utterances. Misses are retried silently,
/// service errors back off first, and `Closed` or shutdown ends the stream.
pub struct UtteranceStream<R> {
    recognizer: R,
    run: RunFlag,
    retry_backoff: Duration,
    finished: bool,
}

impl<R: SpeechRecognizer> UtteranceStream<R> {
    pub fn new(recognizer: R, run: RunFlag, retry_backoff: Duration) -> Self {
        Self {
            recognizer,
            run,
            retry_backoff,
            finished: false,
        }
    }
}

impl<R: SpeechRecognizer> Iterator for UtteranceStream<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while !self.finished {
            if !self.run.is_running() {
                self.finished = true;
                break;
            }
            match self.recognizer.listen() {
                Ok(text) => {
                    let text = sanitize_utterance(&text);
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
                Err(RecognitionError::Timeout | RecognitionError::NothingUnderstood) => {}
                Err(RecognitionError::Service(msg)) => {
                    tracing::warn!(error = %msg, "speech recognition service error");
                    self.run.sleep(self.retry_backoff);
                }
                Err(RecognitionError::Closed) => {
                    tracing::info!("speech source closed");
                    self.finished = true;
                }
            }
        }
        None
    }
}

/// Reads one utterance per line, e.g. from stdin or a transcript pipe.
pub struct LineRecognizer<B> {
    input: B,
}

impl<B: BufRead + Send> LineRecognizer<B> {
    pub fn new(input: B) -> Self {
        Self { input }
    }
}

impl<B: BufRead + Send> SpeechRecognizer for LineRecognizer<B> {
    fn listen(&mut self) -> Result<String, RecognitionError> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => Err(RecognitionError::Closed),
            Ok(_) if line.trim().is_empty() => Err(RecognitionError::NothingUnderstood),
            Ok(_) => Ok(line),
            Err(err) => Err(RecognitionError::Service(err.to_string())),
        }
    }
}

/// Accepted wake phrase handed to the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WakeEvent {
    pub text: String,
    pub at: Instant,
}

/// Route utterances: wake phrases through the session gate into the wake
/// queue, anything else into the command queue while a command is awaited.
/// Full queues drop the newest item.
pub fn spawn_listener<I>(
    utterances: I,
    phrases: WakePhrases,
    context: VoiceContext,
    wake_tx: Sender<WakeEvent>,
    command_tx: Sender<String>,
) -> JoinHandle<()>
where
    I: Iterator<Item = String> + Send + 'static,
{
    thread::spawn(move || {
        tracing::debug!("speech listener started");
        for text in utterances {
            tracing::debug!(%text, "recognized");
            if phrases.matches(&text) {
                let at = Instant::now();
                match context.offer_wake(at) {
                    WakeDecision::Accepted => {
                        tracing::info!(%text, "wake phrase detected");
                        if let Err(TrySendError::Full(_)) =
                            wake_tx.try_send(WakeEvent { text, at })
                        {
                            tracing::debug!("wake queue full; event dropped");
                        }
                    }
                    WakeDecision::CoolingDown => tracing::debug!("wake phrase inside cooldown"),
                    WakeDecision::Busy(phase) => {
                        tracing::debug!(phase = phase.label(), "wake phrase while busy")
                    }
                }
                continue;
            }
            if context.phase() == VoicePhase::ListeningCommand {
                tracing::info!(%text, "command received");
                if let Err(TrySendError::Full(_)) = command_tx.try_send(text) {
                    tracing::debug!("command queue full; command dropped");
                }
            }
        }
        tracing::debug!("speech listener stopped");
    })
}
