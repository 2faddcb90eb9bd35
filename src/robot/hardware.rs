//! Motor and IR sensor seams.
//!
//! The GPIO driver for the real chassis lives outside this crate. What ships
//! here are the adapters the binary can run without a board: a motor driver
//! that only logs, and sensors that are either always clear or read from a
//! file another process keeps up to date.

use crate::lock::lock_or_recover;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("sensor source {path} unavailable: {source}")]
    SensorIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("sensor source {path} has malformed reading '{content}'")]
    SensorFormat { path: PathBuf, content: String },
    #[error("motor driver failure: {0}")]
    Motor(String),
}

/// Direction of travel for both motor channels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Drive {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
}

impl Drive {
    pub fn label(self) -> &'static str {
        match self {
            Drive::Forward => "forward",
            Drive::Backward => "backward",
            Drive::TurnLeft => "turn_left",
            Drive::TurnRight => "turn_right",
        }
    }
}

/// Exclusive owner of the motor outputs. Calls must return promptly.
pub trait MotorDriver: Send + Sync {
    /// Run both channels in `drive` direction at `speed` percent duty.
    fn drive(&self, drive: Drive, speed: u8) -> Result<(), HardwareError>;

    fn stop(&self) -> Result<(), HardwareError>;
}

/// The two IR inputs. `true` means the path on that side is clear.
pub trait ObstacleSensors: Send {
    fn read(&mut self) -> Result<(bool, bool), HardwareError>;

    fn describe(&self) -> String;
}

/// Last command seen by a motor driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MotorState {
    Stopped,
    Driving(Drive, u8),
}

/// Motor driver for running without a board: logs each change of command.
pub struct LoggingMotors {
    last: Mutex<MotorState>,
}

impl LoggingMotors {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(MotorState::Stopped),
        }
    }

    pub fn state(&self) -> MotorState {
        *lock_or_recover(&self.last, "motor state")
    }

    fn record(&self, next: MotorState) {
        let previous = {
            let mut last = lock_or_recover(&self.last, "motor state");
            std::mem::replace(&mut *last, next)
        };
        if previous != next {
            match next {
                MotorState::Stopped => tracing::info!("motors stopped"),
                MotorState::Driving(drive, speed) => {
                    tracing::info!(drive = drive.label(), speed, "motors driving")
                }
            }
        }
    }
}

impl Default for LoggingMotors {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorDriver for LoggingMotors {
    fn drive(&self, drive: Drive, speed: u8) -> Result<(), HardwareError> {
        self.record(MotorState::Driving(drive, speed));
        Ok(())
    }

    fn stop(&self) -> Result<(), HardwareError> {
        self.record(MotorState::Stopped);
        Ok(())
    }
}

/// Sensors that always report a clear path on both sides.
pub struct ClearPathSensors;

impl ObstacleSensors for ClearPathSensors {
    fn read(&mut self) -> Result<(bool, bool), HardwareError> {
        Ok((true, true))
    }

    fn describe(&self) -> String {
        "simulated (always clear)".to_string()
    }
}

/// Reads `<left> <right>` from a file on every poll, `1` meaning clear and
/// `0` meaning blocked.
pub struct FileSensors {
    path: PathBuf,
}

impl FileSensors {
    /// Opening fails when the file is missing or its first reading is bad.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HardwareError> {
        let mut sensors = Self { path: path.into() };
        sensors.read()?;
        Ok(sensors)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ObstacleSensors for FileSensors {
    fn read(&mut self) -> Result<(bool, bool), HardwareError> {
        let content = fs::read_to_string(&self.path).map_err(|source| HardwareError::SensorIo {
            path: self.path.clone(),
            source,
        })?;
        parse_reading(&content).ok_or_else(|| HardwareError::SensorFormat {
            path: self.path.clone(),
            content: content.trim().to_string(),
        })
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

fn parse_reading(content: &str) -> Option<(bool, bool)> {
    let mut fields = content.split_whitespace().map(|field| match field {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    });
    let left = fields.next()??;
    let right = fields.next()??;
    if fields.next().is_some() {
        return None;
    }
    Some((left, right))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Motor command as seen by the recording driver.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub(crate) enum MotorCall {
        Drive(Drive, u8),
        Stop,
    }

    #[derive(Clone, Default)]
    pub(crate) struct RecordingMotors {
        pub(crate) calls: Arc<Mutex<Vec<MotorCall>>>,
    }

    impl RecordingMotors {
        pub(crate) fn snapshot(&self) -> Vec<MotorCall> {
            lock_or_recover(&self.calls, "recorded motor calls").clone()
        }
    }

    impl MotorDriver for RecordingMotors {
        fn drive(&self, drive: Drive, speed: u8) -> Result<(), HardwareError> {
            lock_or_recover(&self.calls, "recorded motor calls")
                .push(MotorCall::Drive(drive, speed));
            Ok(())
        }

        fn stop(&self) -> Result<(), HardwareError> {
            lock_or_recover(&self.calls, "recorded motor calls").push(MotorCall::Stop);
            Ok(())
        }
    }

    /// Replays a fixed list of readings, then repeats the last one.
    pub(crate) struct ScriptedSensors {
        readings: VecDeque<(bool, bool)>,
        last: (bool, bool),
    }

    impl ScriptedSensors {
        pub(crate) fn new(readings: &[(bool, bool)]) -> Self {
            Self {
                readings: readings.iter().copied().collect(),
                last: (true, true),
            }
        }
    }

    impl ObstacleSensors for ScriptedSensors {
        fn read(&mut self) -> Result<(bool, bool), HardwareError> {
            if let Some(next) = self.readings.pop_front() {
                self.last = next;
            }
            Ok(self.last)
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reading_accepts_two_binary_fields() {
        assert_eq!(parse_reading("1 1\n"), Some((true, true)));
        assert_eq!(parse_reading("0 1"), Some((false, true)));
        assert_eq!(parse_reading("  1\t0  "), Some((true, false)));
        assert_eq!(parse_reading("1"), None);
        assert_eq!(parse_reading("1 0 1"), None);
        assert_eq!(parse_reading("yes no"), None);
    }

    #[test]
    fn file_sensors_fail_to_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSensors::open(dir.path().join("absent")).err().unwrap();
        assert!(matches!(err, HardwareError::SensorIo { .. }));
    }

    #[test]
    fn file_sensors_follow_file_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ir");
        fs::write(&path, "1 1\n").unwrap();
        let mut sensors = FileSensors::open(&path).unwrap();
        assert_eq!(sensors.read().unwrap(), (true, true));
        fs::write(&path, "0 1\n").unwrap();
        assert_eq!(sensors.read().unwrap(), (false, true));
        fs::write(&path, "garbage\n").unwrap();
        assert!(matches!(
            sensors.read(),
            Err(HardwareError::SensorFormat { .. })
        ));
    }

    #[test]
    fn logging_motors_track_last_command() {
        let motors = LoggingMotors::new();
        assert_eq!(motors.state(), MotorState::Stopped);
        motors.drive(Drive::TurnLeft, 70).unwrap();
        assert_eq!(motors.state(), MotorState::Driving(Drive::TurnLeft, 70));
        motors.stop().unwrap();
        assert_eq!(motors.state(), MotorState::Stopped);
    }
}
