//! Command-line parsing and validation for both processes.

pub mod defaults;
mod validation;

use clap::{ArgAction, Args, Parser, ValueEnum};
use std::path::PathBuf;

use defaults::*;

/// Logging flags shared by both binaries.
#[derive(Debug, Args, Clone)]
pub struct LogArgs {
    /// Write logs to a size-capped file in the temp dir instead of stderr
    #[arg(long = "logs", env = "ROVERVOX_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable file logging (overrides --logs)
    #[arg(long = "no-logs", env = "ROVERVOX_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Emit JSON lines instead of human-readable text
    #[arg(long = "log-json", default_value_t = false)]
    pub log_json: bool,

    /// Most verbose level that is recorded
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// CLI options for the robot process (motor/sensor owner).
#[derive(Debug, Parser, Clone)]
#[command(about = "RoverVox robot controller", author, version)]
pub struct RobotConfig {
    /// Cruise duty cycle (percent)
    #[arg(long = "base-speed", default_value_t = DEFAULT_BASE_SPEED)]
    pub base_speed: u8,

    /// Duty cycle for single-side obstacle avoidance (percent)
    #[arg(long = "avoidance-speed", default_value_t = DEFAULT_AVOIDANCE_SPEED)]
    pub avoidance_speed: u8,

    /// Duty cycle when both sensors are blocked (percent)
    #[arg(long = "complex-speed", default_value_t = DEFAULT_COMPLEX_MANEUVER_SPEED)]
    pub complex_speed: u8,

    /// How long to reverse before pivoting (milliseconds)
    #[arg(long = "backward-ms", default_value_t = DEFAULT_BACKWARD_MS)]
    pub backward_ms: u64,

    /// How long to pivot away from an obstacle (milliseconds)
    #[arg(long = "turn-ms", default_value_t = DEFAULT_TURN_MS)]
    pub turn_ms: u64,

    /// Sensor polling interval (milliseconds)
    #[arg(long = "sensor-poll-ms", default_value_t = DEFAULT_SENSOR_POLL_MS)]
    pub sensor_poll_ms: u64,

    /// Movement decision interval (milliseconds)
    #[arg(long = "movement-poll-ms", default_value_t = DEFAULT_MOVEMENT_POLL_MS)]
    pub movement_poll_ms: u64,

    /// How often pending control signals are drained (milliseconds)
    #[arg(long = "dispatch-poll-ms", default_value_t = DEFAULT_DISPATCH_POLL_MS)]
    pub dispatch_poll_ms: u64,

    /// Minimum interval before the same key is accepted again (milliseconds)
    #[arg(long = "key-repeat-ms", default_value_t = DEFAULT_KEY_REPEAT_MS)]
    pub key_repeat_ms: u64,

    /// Disable local keyboard control
    #[arg(long = "no-keyboard", default_value_t = false)]
    pub no_keyboard: bool,

    /// Read the IR pair from this file ("<left> <right>", 1 = clear) instead of hardware
    #[arg(long = "sensor-file", env = "ROVERVOX_SENSOR_FILE")]
    pub sensor_file: Option<PathBuf>,

    /// File the current mood icon name is written to
    #[arg(long = "mood-file", env = "ROVERVOX_MOOD_FILE")]
    pub mood_file: Option<PathBuf>,

    #[command(flatten)]
    pub log: LogArgs,
}

/// CLI options for the voice assistant process.
#[derive(Debug, Parser, Clone)]
#[command(about = "RoverVox voice assistant", author, version)]
pub struct VoiceConfig {
    /// Process id of the running robot controller
    pub robot_pid: Option<i32>,

    /// Base URL of the response synthesis service
    #[arg(long = "server-url", env = "ROVERVOX_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Voice identity requested from the synthesis service
    #[arg(long, default_value = DEFAULT_SPEAKER)]
    pub speaker: String,

    /// Sample rate requested from the synthesis service (Hz)
    #[arg(long = "tts-sample-rate", default_value_t = DEFAULT_TTS_SAMPLE_RATE)]
    pub tts_sample_rate: u32,

    /// Synthesis request timeout (milliseconds)
    #[arg(long = "synthesis-timeout-ms", default_value_t = DEFAULT_SYNTHESIS_TIMEOUT_MS)]
    pub synthesis_timeout_ms: u64,

    /// Health probe timeout (milliseconds)
    #[arg(long = "health-timeout-ms", default_value_t = DEFAULT_HEALTH_TIMEOUT_MS)]
    pub health_timeout_ms: u64,

    /// Start even if the synthesis service is not ready
    #[arg(long = "skip-health-check", default_value_t = false)]
    pub skip_health_check: bool,

    /// Answer in-process (echo replies, tone audio) instead of calling the service
    #[arg(long, default_value_t = false)]
    pub offline: bool,

    /// Directory for cached offline reply audio
    #[arg(long = "cache-dir", env = "ROVERVOX_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Wake phrase (repeatable, matched case-insensitively as a substring)
    #[arg(long = "wake-phrase", action = ArgAction::Append, value_name = "PHRASE")]
    pub wake_phrases: Vec<String>,

    /// Minimum time between accepted wake events (milliseconds)
    #[arg(long = "wake-cooldown-ms", default_value_t = DEFAULT_WAKE_COOLDOWN_MS)]
    pub wake_cooldown_ms: u64,

    /// How long to wait for a command after the wake gesture (milliseconds)
    #[arg(long = "command-timeout-ms", default_value_t = DEFAULT_COMMAND_TIMEOUT_MS)]
    pub command_timeout_ms: u64,

    /// Delay after a response before returning to idle (milliseconds)
    #[arg(long = "return-delay-ms", default_value_t = DEFAULT_RETURN_DELAY_MS)]
    pub return_delay_ms: u64,

    /// How long the error mood is held after a failed synthesis (milliseconds)
    #[arg(long = "error-hold-ms", default_value_t = DEFAULT_ERROR_HOLD_MS)]
    pub error_hold_ms: u64,

    /// Idle loop poll interval (milliseconds)
    #[arg(long = "idle-poll-ms", default_value_t = DEFAULT_IDLE_POLL_MS)]
    pub idle_poll_ms: u64,

    /// Chance per idle poll of a cosmetic mood change (0.0 - 1.0)
    #[arg(long = "idle-mood-chance", default_value_t = DEFAULT_IDLE_MOOD_CHANCE)]
    pub idle_mood_chance: f64,

    /// Back-off after a speech service error (milliseconds)
    #[arg(long = "recognizer-backoff-ms", default_value_t = DEFAULT_RECOGNIZER_BACKOFF_MS)]
    pub recognizer_backoff_ms: u64,

    /// Short gesture turn (milliseconds)
    #[arg(long = "gesture-short-ms", default_value_t = DEFAULT_GESTURE_SHORT_MS)]
    pub gesture_short_ms: u64,

    /// Medium gesture turn (milliseconds)
    #[arg(long = "gesture-medium-ms", default_value_t = DEFAULT_GESTURE_MEDIUM_MS)]
    pub gesture_medium_ms: u64,

    /// Pause between gesture moves (milliseconds)
    #[arg(long = "gesture-between-ms", default_value_t = DEFAULT_GESTURE_BETWEEN_MS)]
    pub gesture_between_ms: u64,

    /// Wait after a mode change so the robot can apply it (milliseconds)
    #[arg(long = "gesture-settle-ms", default_value_t = DEFAULT_GESTURE_SETTLE_MS)]
    pub gesture_settle_ms: u64,

    /// File the current mood icon name is written to
    #[arg(long = "mood-file", env = "ROVERVOX_MOOD_FILE")]
    pub mood_file: Option<PathBuf>,

    #[command(flatten)]
    pub log: LogArgs,
}
