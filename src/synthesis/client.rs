use super::{Response, ResponseSynthesizer, SynthesisError};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ConversationRequest<'a> {
    user_text: &'a str,
    speaker: &'a str,
    sample_rate: u32,
}

#[derive(Debug, Deserialize)]
struct ConversationReply {
    #[serde(default)]
    audio_base64: String,
    sample_rate: u32,
    #[serde(default)]
    user_text: String,
    #[serde(default)]
    bot_response: String,
    #[serde(default)]
    is_error: bool,
    #[serde(default)]
    message: String,
}

/// Body of `GET /health`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
}

impl HealthStatus {
    pub fn is_ready(&self) -> bool {
        self.status == "ok" && self.model_loaded
    }
}

/// Blocking client for the remote synthesis service.
pub struct HttpSynthesisClient {
    agent: ureq::Agent,
    base_url: String,
    speaker: String,
    sample_rate: u32,
    request_timeout: Duration,
    health_timeout: Duration,
}

impl HttpSynthesisClient {
    pub fn new(
        base_url: &str,
        speaker: &str,
        sample_rate: u32,
        request_timeout: Duration,
        health_timeout: Duration,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(health_timeout)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            speaker: speaker.to_string(),
            sample_rate,
            request_timeout,
            health_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe `GET /health`.
    pub fn health(&self) -> Result<HealthStatus, SynthesisError> {
        let response = self
            .agent
            .get(&format!("{}/health", self.base_url))
            .timeout(self.health_timeout)
            .call()
            .map_err(map_ureq_error)?;
        response
            .into_json::<HealthStatus>()
            .map_err(|err| SynthesisError::Decode(err.to_string()))
    }
}

impl ResponseSynthesizer for HttpSynthesisClient {
    fn synthesize(&self, text: &str) -> Result<Response, SynthesisError> {
        let preview: String = text.chars().take(50).collect();
        tracing::info!(text = %preview, "requesting synthesis");
        let request = ConversationRequest {
            user_text: text,
            speaker: &self.speaker,
            sample_rate: self.sample_rate,
        };
        let reply: ConversationReply = self
            .agent
            .post(&format!("{}/conversation", self.base_url))
            .timeout(self.request_timeout)
            .send_json(&request)
            .map_err(map_ureq_error)?
            .into_json()
            .map_err(|err| SynthesisError::Decode(err.to_string()))?;
        let response = decode_reply(reply, text)?;
        tracing::info!(
            bytes = response.audio_bytes.len(),
            is_error = response.is_error,
            message = %response.status_message,
            "synthesis reply received"
        );
        Ok(response)
    }
}

fn decode_reply(reply: ConversationReply, request_text: &str) -> Result<Response, SynthesisError> {
    if reply.audio_base64.trim().is_empty() {
        return Err(SynthesisError::EmptyAudio);
    }
    let audio_bytes = base64::engine::general_purpose::STANDARD
        .decode(reply.audio_base64.trim())
        .map_err(|err| SynthesisError::Decode(format!("audio_base64: {err}")))?;
    if audio_bytes.is_empty() {
        return Err(SynthesisError::EmptyAudio);
    }
    let request_text = if reply.user_text.is_empty() {
        request_text.to_string()
    } else {
        reply.user_text
    };
    Ok(Response {
        audio_bytes,
        sample_rate: reply.sample_rate,
        request_text,
        response_text: reply.bot_response,
        is_error: reply.is_error,
        status_message: reply.message,
    })
}

fn map_ureq_error(err: ureq::Error) -> SynthesisError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            SynthesisError::Rejected {
                status,
                body: body.trim().to_string(),
            }
        }
        ureq::Error::Transport(transport) => SynthesisError::Transient(transport.to_string()),
    }
}
