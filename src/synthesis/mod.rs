//! Response synthesis: turn a recognized command into spoken audio.
//!
//! The voice process talks to a remote service through `HttpSynthesisClient`.
//! `ConversationService` is the in-process version of the same contract, used
//! by `--offline` runs and by tests.

mod cache;
mod client;
mod service;

pub use cache::{cache_key, CachedGenerator, SpeechGenerator, ToneGenerator};
pub use client::{HealthStatus, HttpSynthesisClient};
pub use service::{
    ConversationService, EchoReplies, ReplyProvider, ERROR_ECHO_MESSAGE, SUCCESS_MESSAGE,
};

use thiserror::Error;

/// One synthesized reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub audio_bytes: Vec<u8>,
    pub sample_rate: u32,
    pub request_text: String,
    pub response_text: String,
    /// The upstream reply failed and the audio echoes the request instead.
    pub is_error: bool,
    pub status_message: String,
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis service unreachable: {0}")]
    Transient(String),
    #[error("synthesis service rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("synthesis service returned no audio")]
    EmptyAudio,
    #[error("malformed synthesis response: {0}")]
    Decode(String),
    #[error("speech generation failed: {0}")]
    Generation(String),
    #[error("reply provider failed: {0}")]
    Upstream(String),
}

impl SynthesisError {
    /// Worth retrying later; the service may come back.
    pub fn is_transient(&self) -> bool {
        matches!(self, SynthesisError::Transient(_))
    }
}

/// Anything that can answer a command with audio.
///
/// `Ok` with `is_error = false` is a normal reply, `Ok` with `is_error = true`
/// is an error echo, and `Err` is a hard failure with nothing to play.
pub trait ResponseSynthesizer: Send + Sync {
    fn synthesize(&self, text: &str) -> Result<Response, SynthesisError>;
}
