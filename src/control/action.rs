use std::fmt;

#[cfg(any(target_os = "linux", target_os = "android"))]
const TURN_RIGHT_SIGNAL: libc::c_int = libc::SIGPWR;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const TURN_RIGHT_SIGNAL: libc::c_int = libc::SIGVTALRM;

#[cfg(any(target_os = "linux", target_os = "android"))]
const TURN_RIGHT_SIGNAL_NAME: &str = "SIGPWR";
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const TURN_RIGHT_SIGNAL_NAME: &str = "SIGVTALRM";

/// Closed set of commands the voice process (or local keys) can issue to the robot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ControlAction {
    ToggleMode,
    MoveForward,
    MoveBackward,
    TurnLeft,
    TurnRight,
    Stop,
    Pause,
    Resume,
    ResetSensors,
}

impl ControlAction {
    /// Drain order used by the signal dispatcher.
    pub const ALL: [ControlAction; 9] = [
        ControlAction::ToggleMode,
        ControlAction::MoveForward,
        ControlAction::MoveBackward,
        ControlAction::TurnLeft,
        ControlAction::TurnRight,
        ControlAction::Stop,
        ControlAction::Pause,
        ControlAction::Resume,
        ControlAction::ResetSensors,
    ];

    /// OS signal bound to this action.
    pub fn signal(self) -> libc::c_int {
        match self {
            ControlAction::ToggleMode => libc::SIGUSR1,
            ControlAction::MoveForward => libc::SIGUSR2,
            ControlAction::MoveBackward => libc::SIGWINCH,
            ControlAction::TurnLeft => libc::SIGIO,
            ControlAction::TurnRight => TURN_RIGHT_SIGNAL,
            ControlAction::Stop => libc::SIGXCPU,
            ControlAction::Pause => libc::SIGTRAP,
            ControlAction::Resume => libc::SIGALRM,
            ControlAction::ResetSensors => libc::SIGPROF,
        }
    }

    pub fn signal_name(self) -> &'static str {
        match self {
            ControlAction::ToggleMode => "SIGUSR1",
            ControlAction::MoveForward => "SIGUSR2",
            ControlAction::MoveBackward => "SIGWINCH",
            ControlAction::TurnLeft => "SIGIO",
            ControlAction::TurnRight => TURN_RIGHT_SIGNAL_NAME,
            ControlAction::Stop => "SIGXCPU",
            ControlAction::Pause => "SIGTRAP",
            ControlAction::Resume => "SIGALRM",
            ControlAction::ResetSensors => "SIGPROF",
        }
    }

    /// Reverse lookup. Pure, so it is safe to call from a signal handler.
    pub fn from_signal(signo: libc::c_int) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.signal() == signo)
    }

    pub(crate) fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub fn label(self) -> &'static str {
        match self {
            ControlAction::ToggleMode => "toggle_mode",
            ControlAction::MoveForward => "forward",
            ControlAction::MoveBackward => "backward",
            ControlAction::TurnLeft => "turn_left",
            ControlAction::TurnRight => "turn_right",
            ControlAction::Stop => "stop",
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
            ControlAction::ResetSensors => "reset_sensors",
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
