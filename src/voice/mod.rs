//! Voice process: wake phrase detection, the acknowledgement gesture, command
//! capture and spoken replies.
//!
//! One pipeline thread owns the state machine. A listener thread feeds it wake
//! events and commands over bounded queues; replies are synthesized and played
//! on short-lived workers so the pipeline keeps polling.

mod capture;
mod gesture;
mod pipeline;
mod playback;
mod session;
mod wake;

pub use capture::{
    sanitize_utterance, spawn_listener, LineRecognizer, RecognitionError, SpeechRecognizer,
    UtteranceStream, WakeEvent,
};
pub use gesture::{
    animate_wake_eyes, GestureOutcome, GestureSequencer, GestureTimings, Hold, GESTURE_SCRIPT,
};
pub use pipeline::{await_command, PipelineTimings, VoicePipeline, VoiceQueues};
#[cfg(feature = "playback")]
pub use playback::RodioBackend;
pub use playback::{
    default_backend, AudioPlaybackManager, PlaybackBackend, PlaybackError, SilentBackend,
};
pub use session::{VoiceContext, VoicePhase, VoiceSession, WakeDecision};
pub use wake::{WakeGate, WakePhrases};
