//! Robot process: obstacle avoidance, manual override and the signal-driven
//! command interface.
//!
//! `RobotControl` owns the only state lock. Three workers share it: sensor
//! polling, movement, and signal dispatch. Keyboard input is forwarded to the
//! main thread, which applies it through the same control handle.

mod controller;
pub mod hardware;
pub mod keys;
mod policy;
mod state;
mod workers;

pub use controller::{ManeuverOutcome, MotionTuning, RobotControl};
pub use hardware::{
    ClearPathSensors, Drive, FileSensors, HardwareError, LoggingMotors, MotorDriver,
    ObstacleSensors,
};
pub use keys::{map_key, spawn_key_reader, KeyRepeatGate, LocalCommand, KEY_HELP};
pub use policy::{decide_motion, Maneuver};
pub use state::{Mode, MotorCommand, RobotState, Transition};
pub use workers::{
    spawn_channel_dispatcher, spawn_movement_worker, spawn_sensor_worker,
    spawn_signal_dispatcher, RobotTimings,
};
