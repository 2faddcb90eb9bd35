//! Default tuning values for the robot and voice processes.

// Motion.
pub const DEFAULT_BASE_SPEED: u8 = 60;
pub const DEFAULT_AVOIDANCE_SPEED: u8 = 70;
pub const DEFAULT_COMPLEX_MANEUVER_SPEED: u8 = 80;
pub const DEFAULT_BACKWARD_MS: u64 = 700;
pub const DEFAULT_TURN_MS: u64 = 1_300;

// Robot worker cadence.
pub const DEFAULT_SENSOR_POLL_MS: u64 = 50;
pub const DEFAULT_MOVEMENT_POLL_MS: u64 = 50;
pub const DEFAULT_DISPATCH_POLL_MS: u64 = 10;
pub const DEFAULT_KEY_REPEAT_MS: u64 = 150;

// Synthesis service.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_SPEAKER: &str = "baya";
pub const DEFAULT_TTS_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_SYNTHESIS_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_HEALTH_TIMEOUT_MS: u64 = 5_000;

// Voice pipeline.
pub const DEFAULT_WAKE_PHRASE: &str = "радик";
pub const DEFAULT_WAKE_COOLDOWN_MS: u64 = 3_000;
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_RETURN_DELAY_MS: u64 = 3_000;
pub const DEFAULT_ERROR_HOLD_MS: u64 = 1_500;
pub const DEFAULT_IDLE_POLL_MS: u64 = 100;
pub const DEFAULT_IDLE_MOOD_CHANCE: f64 = 0.05;
pub const DEFAULT_RECOGNIZER_BACKOFF_MS: u64 = 100;
pub const SPEAKING_FACE_DELAY_MS: u64 = 1_500;
pub const PLAYBACK_ERROR_HOLD_MS: u64 = 1_000;

// Gesture choreography.
pub const DEFAULT_GESTURE_SHORT_MS: u64 = 300;
pub const DEFAULT_GESTURE_MEDIUM_MS: u64 = 600;
pub const DEFAULT_GESTURE_BETWEEN_MS: u64 = 200;
pub const DEFAULT_GESTURE_SETTLE_MS: u64 = 500;
pub const DEFAULT_GESTURE_EYE_MS: u64 = 200;

// Queues.
pub const COMMAND_QUEUE_CAPACITY: usize = 10;
pub const WAKE_QUEUE_CAPACITY: usize = 5;

// Hard limits enforced by validation.
pub const MAX_MANEUVER_MS: u64 = 10_000;
pub const MAX_POLL_MS: u64 = 1_000;
pub const MAX_TIMEOUT_MS: u64 = 120_000;
pub const MAX_WAKE_PHRASES: usize = 16;
