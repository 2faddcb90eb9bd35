use super::defaults::{
    COMMAND_QUEUE_CAPACITY, DEFAULT_GESTURE_EYE_MS, DEFAULT_WAKE_PHRASE, MAX_MANEUVER_MS,
    MAX_POLL_MS, MAX_TIMEOUT_MS, MAX_WAKE_PHRASES, PLAYBACK_ERROR_HOLD_MS, SPEAKING_FACE_DELAY_MS,
    WAKE_QUEUE_CAPACITY,
};
use super::{RobotConfig, VoiceConfig};
use crate::robot::{MotionTuning, RobotTimings};
use crate::voice::{GestureTimings, PipelineTimings};
use anyhow::{bail, Result};
use clap::Parser;
use std::time::Duration;

impl RobotConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values against the ranges the motor driver and workers accept.
    pub fn validate(&mut self) -> Result<()> {
        for (flag, value) in [
            ("--base-speed", self.base_speed),
            ("--avoidance-speed", self.avoidance_speed),
            ("--complex-speed", self.complex_speed),
        ] {
            if value > 100 {
                bail!("{flag} must be between 0 and 100 percent, got {value}");
            }
        }
        for (flag, value) in [
            ("--backward-ms", self.backward_ms),
            ("--turn-ms", self.turn_ms),
        ] {
            if value == 0 || value > MAX_MANEUVER_MS {
                bail!("{flag} must be between 1 and {MAX_MANEUVER_MS} ms, got {value}");
            }
        }
        for (flag, value) in [
            ("--sensor-poll-ms", self.sensor_poll_ms),
            ("--movement-poll-ms", self.movement_poll_ms),
            ("--dispatch-poll-ms", self.dispatch_poll_ms),
        ] {
            if value == 0 || value > MAX_POLL_MS {
                bail!("{flag} must be between 1 and {MAX_POLL_MS} ms, got {value}");
            }
        }
        if self.key_repeat_ms > MAX_POLL_MS {
            bail!(
                "--key-repeat-ms must be at most {MAX_POLL_MS} ms, got {}",
                self.key_repeat_ms
            );
        }
        if let Some(path) = &self.sensor_file {
            if path.as_os_str().is_empty() {
                bail!("--sensor-file must not be empty");
            }
        }
        Ok(())
    }

    pub fn motion_tuning(&self) -> MotionTuning {
        MotionTuning {
            base_speed: self.base_speed,
            avoidance_speed: self.avoidance_speed,
            complex_speed: self.complex_speed,
            backward: Duration::from_millis(self.backward_ms),
            turn: Duration::from_millis(self.turn_ms),
        }
    }

    pub fn robot_timings(&self) -> RobotTimings {
        RobotTimings {
            sensor_poll: Duration::from_millis(self.sensor_poll_ms),
            movement_poll: Duration::from_millis(self.movement_poll_ms),
            dispatch_poll: Duration::from_millis(self.dispatch_poll_ms),
            key_repeat: Duration::from_millis(self.key_repeat_ms),
        }
    }
}

impl VoiceConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize the wake phrase list.
    pub fn validate(&mut self) -> Result<()> {
        if let Some(pid) = self.robot_pid {
            if pid <= 1 {
                bail!("robot pid must be greater than 1, got {pid}");
            }
        }

        let url = self.server_url.trim().trim_end_matches('/');
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!(
                "--server-url must start with http:// or https://, got '{}'",
                self.server_url
            );
        }
        self.server_url = url.to_string();

        if self.speaker.trim().is_empty()
            || !self
                .speaker
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        {
            bail!("--speaker must be a non-empty identifier, got '{}'", self.speaker);
        }
        if !(8_000..=96_000).contains(&self.tts_sample_rate) {
            bail!(
                "--tts-sample-rate must be between 8000 and 96000 Hz, got {}",
                self.tts_sample_rate
            );
        }

        for (flag, value) in [
            ("--synthesis-timeout-ms", self.synthesis_timeout_ms),
            ("--health-timeout-ms", self.health_timeout_ms),
            ("--command-timeout-ms", self.command_timeout_ms),
        ] {
            if value == 0 || value > MAX_TIMEOUT_MS {
                bail!("{flag} must be between 1 and {MAX_TIMEOUT_MS} ms, got {value}");
            }
        }
        for (flag, value) in [
            ("--wake-cooldown-ms", self.wake_cooldown_ms),
            ("--return-delay-ms", self.return_delay_ms),
            ("--error-hold-ms", self.error_hold_ms),
        ] {
            if value > MAX_TIMEOUT_MS {
                bail!("{flag} must be at most {MAX_TIMEOUT_MS} ms, got {value}");
            }
        }
        if self.idle_poll_ms == 0 || self.idle_poll_ms > MAX_POLL_MS {
            bail!(
                "--idle-poll-ms must be between 1 and {MAX_POLL_MS} ms, got {}",
                self.idle_poll_ms
            );
        }
        if !(0.0..=1.0).contains(&self.idle_mood_chance) {
            bail!(
                "--idle-mood-chance must be between 0.0 and 1.0, got {}",
                self.idle_mood_chance
            );
        }
        if self.recognizer_backoff_ms > MAX_POLL_MS {
            bail!(
                "--recognizer-backoff-ms must be at most {MAX_POLL_MS} ms, got {}",
                self.recognizer_backoff_ms
            );
        }
        for (flag, value) in [
            ("--gesture-short-ms", self.gesture_short_ms),
            ("--gesture-medium-ms", self.gesture_medium_ms),
            ("--gesture-between-ms", self.gesture_between_ms),
            ("--gesture-settle-ms", self.gesture_settle_ms),
        ] {
            if value > MAX_MANEUVER_MS {
                bail!("{flag} must be at most {MAX_MANEUVER_MS} ms, got {value}");
            }
        }

        let mut phrases: Vec<String> = self
            .wake_phrases
            .iter()
            .map(|phrase| phrase.trim().to_lowercase())
            .filter(|phrase| !phrase.is_empty())
            .collect();
        if phrases.is_empty() {
            if !self.wake_phrases.is_empty() {
                bail!("--wake-phrase values must not be blank");
            }
            phrases.push(DEFAULT_WAKE_PHRASE.to_string());
        }
        phrases.sort();
        phrases.dedup();
        if phrases.len() > MAX_WAKE_PHRASES {
            bail!(
                "--wake-phrase repeated too many times (max {MAX_WAKE_PHRASES}, got {})",
                phrases.len()
            );
        }
        self.wake_phrases = phrases;
        if let Some(dir) = &self.cache_dir {
            if dir.as_os_str().is_empty() {
                bail!("--cache-dir must not be empty");
            }
        }
        Ok(())
    }

    pub fn pipeline_timings(&self) -> PipelineTimings {
        PipelineTimings {
            wake_cooldown: Duration::from_millis(self.wake_cooldown_ms),
            command_timeout: Duration::from_millis(self.command_timeout_ms),
            return_delay: Duration::from_millis(self.return_delay_ms),
            error_hold: Duration::from_millis(self.error_hold_ms),
            idle_poll: Duration::from_millis(self.idle_poll_ms),
            idle_mood_chance: self.idle_mood_chance,
            recognizer_backoff: Duration::from_millis(self.recognizer_backoff_ms),
            speaking_face_delay: Duration::from_millis(SPEAKING_FACE_DELAY_MS),
            playback_error_hold: Duration::from_millis(PLAYBACK_ERROR_HOLD_MS),
            command_queue_capacity: COMMAND_QUEUE_CAPACITY,
            wake_queue_capacity: WAKE_QUEUE_CAPACITY,
        }
    }

    pub fn gesture_timings(&self) -> GestureTimings {
        GestureTimings {
            short: Duration::from_millis(self.gesture_short_ms),
            medium: Duration::from_millis(self.gesture_medium_ms),
            between: Duration::from_millis(self.gesture_between_ms),
            settle: Duration::from_millis(self.gesture_settle_ms),
            eye_frame: Duration::from_millis(DEFAULT_GESTURE_EYE_MS),
        }
    }
}
