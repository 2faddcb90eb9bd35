//! Robot control state and its transitions.
//!
//! Every transition is a plain method on `RobotState` that returns the
//! actuation it wants. The controller runs it under the state lock and applies
//! the result after the lock is released, so motors and display calls never
//! happen while the lock is held.

use super::hardware::Drive;
use super::policy::{decide_motion, Maneuver};
use crate::control::ControlAction;
use crate::mood::MoodIcon;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Autonomous,
    Manual,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Autonomous => "autonomous",
            Mode::Manual => "manual",
        }
    }
}

/// Motor request produced by a transition. Speed is resolved by the controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MotorCommand {
    Stop,
    Drive(Drive),
}

/// Side effects a transition asks for.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Transition {
    pub motors: Option<MotorCommand>,
    pub icon: Option<MoodIcon>,
}

impl Transition {
    fn stop_and_show(icon: MoodIcon) -> Self {
        Self {
            motors: Some(MotorCommand::Stop),
            icon: Some(icon),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.motors.is_none() && self.icon.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RobotState {
    mode: Mode,
    paused: bool,
    pre_pause_mode: Option<Mode>,
    left_ir: bool,
    right_ir: bool,
    force_sensor_update: bool,
    sensor_reset_requested: bool,
    last_processed: Option<(bool, bool)>,
}

impl Default for RobotState {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotState {
    /// Autonomous, unpaused, waiting for the first sensor reading.
    pub fn new() -> Self {
        let mut state = Self {
            mode: Mode::Autonomous,
            paused: false,
            pre_pause_mode: None,
            left_ir: false,
            right_ir: false,
            force_sensor_update: false,
            sensor_reset_requested: false,
            last_processed: None,
        };
        state.request_sensor_reset();
        state
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn readings(&self) -> (bool, bool) {
        (self.left_ir, self.right_ir)
    }

    pub fn last_processed(&self) -> Option<(bool, bool)> {
        self.last_processed
    }

    pub fn reset_pending(&self) -> bool {
        self.force_sensor_update || self.sensor_reset_requested
    }

    /// Autonomous and not paused: the only state in which maneuvers may run.
    pub fn maneuvers_allowed(&self) -> bool {
        self.mode == Mode::Autonomous && !self.paused
    }

    pub fn toggle_mode(&mut self) -> Transition {
        self.mode = match self.mode {
            Mode::Autonomous => Mode::Manual,
            Mode::Manual => Mode::Autonomous,
        };
        if self.paused {
            // Resume restores the pre-pause mode; nothing moves until then.
            return Transition::default();
        }
        match self.mode {
            Mode::Autonomous => {
                self.request_sensor_reset();
                Transition {
                    motors: Some(MotorCommand::Drive(Drive::Forward)),
                    icon: Some(MoodIcon::Common),
                }
            }
            Mode::Manual => Transition::stop_and_show(MoodIcon::Evil),
        }
    }

    pub fn pause(&mut self) -> Transition {
        if self.paused {
            return Transition::default();
        }
        self.pre_pause_mode = Some(self.mode);
        self.paused = true;
        Transition::stop_and_show(MoodIcon::Closed)
    }

    pub fn resume(&mut self) -> Transition {
        if !self.paused {
            return Transition::default();
        }
        self.paused = false;
        if let Some(mode) = self.pre_pause_mode.take() {
            self.mode = mode;
        }
        if self.mode == Mode::Autonomous {
            self.request_sensor_reset();
            return Transition {
                motors: None,
                icon: Some(MoodIcon::Common),
            };
        }
        Transition::default()
    }

    /// Pause when running, resume when paused.
    pub fn toggle_pause(&mut self) -> Transition {
        if self.paused {
            self.resume()
        } else {
            self.pause()
        }
    }

    /// Forget the debounced pair so the next fresh reading is always processed.
    pub fn request_sensor_reset(&mut self) {
        self.left_ir = false;
        self.right_ir = false;
        self.last_processed = None;
        self.force_sensor_update = true;
        self.sensor_reset_requested = true;
    }

    /// Store a fresh sensor reading. Returns whether it differs from the last
    /// pair the movement worker acted on.
    pub fn apply_reading(&mut self, left: bool, right: bool) -> bool {
        self.left_ir = left;
        self.right_ir = right;
        self.force_sensor_update = false;
        self.last_processed != Some((left, right))
    }

    /// Pick the next maneuver, if any, and mark the current pair processed.
    ///
    /// Nothing is decided while a forced update still waits for a fresh
    /// reading, so a reset never acts on the cleared placeholder pair.
    pub fn next_maneuver(&mut self) -> Option<Maneuver> {
        if !self.maneuvers_allowed() || self.force_sensor_update {
            return None;
        }
        let pair = (self.left_ir, self.right_ir);
        if !self.sensor_reset_requested && self.last_processed == Some(pair) {
            return None;
        }
        self.last_processed = Some(pair);
        self.sensor_reset_requested = false;
        Some(decide_motion(pair.0, pair.1))
    }

    /// Directional command from a signal or key. Ignored unless manual and unpaused.
    pub fn manual_command(&mut self, action: ControlAction) -> Transition {
        if self.mode != Mode::Manual || self.paused {
            return Transition::default();
        }
        let command = match action {
            ControlAction::MoveForward => MotorCommand::Drive(Drive::Forward),
            ControlAction::MoveBackward => MotorCommand::Drive(Drive::Backward),
            ControlAction::TurnLeft => MotorCommand::Drive(Drive::TurnLeft),
            ControlAction::TurnRight => MotorCommand::Drive(Drive::TurnRight),
            ControlAction::Stop => MotorCommand::Stop,
            _ => return Transition::default(),
        };
        Transition {
            motors: Some(command),
            icon: None,
        }
    }
}
