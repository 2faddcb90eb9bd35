#[cfg(not(unix))]
compile_error!("rovervox coordinates its two processes with POSIX signals and only builds on unix");

pub mod config;
pub mod control;
mod lock;
pub mod logging;
pub mod mood;
pub mod robot;
pub mod runtime;
pub mod synthesis;
pub mod terminal_restore;
pub mod voice;

pub use control::{ControlAction, ControlError, ControlSink};
pub use mood::{DisplayFeedback, MoodIcon};
pub use runtime::RunFlag;
