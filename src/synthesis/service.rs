use super::cache::{CachedGenerator, SpeechGenerator};
use super::{Response, ResponseSynthesizer, SynthesisError};

pub const SUCCESS_MESSAGE: &str = "success";
pub const ERROR_ECHO_MESSAGE: &str = "error echo";

/// Produces the text the robot should say back.
pub trait ReplyProvider: Send + Sync {
    fn reply(&self, request: &str) -> Result<String, SynthesisError>;
}

/// Repeats the request back. Used when no conversation backend is configured.
pub struct EchoReplies;

impl ReplyProvider for EchoReplies {
    fn reply(&self, request: &str) -> Result<String, SynthesisError> {
        Ok(request.to_string())
    }
}

/// In-process synthesis with the same contract as the remote service: when
/// the reply provider fails, the request text is spoken back with
/// `is_error = true` instead of failing the whole request.
pub struct ConversationService<P, G> {
    replies: P,
    voice: CachedGenerator<G>,
    speaker: String,
    sample_rate: u32,
}

impl<P: ReplyProvider, G: SpeechGenerator> ConversationService<P, G> {
    pub fn new(replies: P, voice: CachedGenerator<G>, speaker: &str, sample_rate: u32) -> Self {
        Self {
            replies,
            voice,
            speaker: speaker.to_string(),
            sample_rate,
        }
    }
}

impl<P: ReplyProvider, G: SpeechGenerator> ResponseSynthesizer for ConversationService<P, G> {
    fn synthesize(&self, text: &str) -> Result<Response, SynthesisError> {
        let (response_text, is_error) = match self.replies.reply(text) {
            Ok(reply) if !reply.trim().is_empty() => (reply, false),
            Ok(_) => {
                tracing::warn!("reply provider returned nothing; echoing request");
                (text.to_string(), true)
            }
            Err(err) => {
                tracing::warn!(%err, "reply provider failed; echoing request");
                (text.to_string(), true)
            }
        };
        let (audio, cached) = self
            .voice
            .get_or_generate(&response_text, &self.speaker, self.sample_rate)?;
        tracing::debug!(cached, bytes = audio.len(), "reply audio ready");
        Ok(Response {
            audio_bytes: audio.as_ref().clone(),
            sample_rate: self.sample_rate,
            request_text: text.to_string(),
            response_text,
            is_error,
            status_message: if is_error {
                ERROR_ECHO_MESSAGE.to_string()
            } else {
                SUCCESS_MESSAGE.to_string()
            },
        })
    }
}
