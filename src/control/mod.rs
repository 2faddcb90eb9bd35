//! Best-effort command channel between the voice and robot processes.
//!
//! Each `ControlAction` maps 1:1 onto a POSIX signal. Delivery is at most once
//! per raise, unordered across action types, and never acknowledged.

mod action;
mod sender;
mod signals;
#[cfg(test)]
mod tests;

use std::io;
use thiserror::Error;

pub use action::ControlAction;
pub use sender::{loopback, ControlSink, LoopbackSink, SignalSender};
pub use signals::{install_shutdown_handler, shutdown_requested, SignalReceiver};

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("no robot process configured")]
    NoTarget,
    #[error("robot process {target} is gone")]
    ProcessUnreachable { target: String },
    #[error("failed to deliver {action} to {target}: {source}")]
    Delivery {
        action: ControlAction,
        target: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to install handler for {signal}: {source}")]
    HandlerInstall {
        signal: &'static str,
        #[source]
        source: io::Error,
    },
}

impl ControlError {
    /// The robot is not there to receive anything; callers stop sending.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            ControlError::ProcessUnreachable { .. } | ControlError::NoTarget
        )
    }
}
