//! Voice-side end of the control channel: fire-and-forget, no acknowledgement.

use super::{ControlAction, ControlError};
use crossbeam_channel::{Sender, TrySendError};
use std::io;

/// Anything that can deliver a `ControlAction` to the robot on a best-effort basis.
pub trait ControlSink: Send + Sync {
    fn send(&self, action: ControlAction) -> Result<(), ControlError>;

    /// Human-readable target for log lines.
    fn target(&self) -> String;
}

/// Delivers actions as POSIX signals to the robot process.
#[derive(Clone, Debug)]
pub struct SignalSender {
    pid: Option<libc::pid_t>,
}

impl SignalSender {
    pub fn new(pid: Option<i32>) -> Self {
        Self { pid }
    }

    /// Whether the target process currently exists (`kill(pid, 0)`).
    pub fn target_alive(&self) -> bool {
        match self.pid {
            Some(pid) => process_exists(pid),
            None => false,
        }
    }
}

fn process_exists(pid: libc::pid_t) -> bool {
    // SAFETY: signal 0 performs only the existence/permission check.
    let res = unsafe { libc::kill(pid, 0) };
    if res == 0 {
        return true;
    }
    // EPERM means the process exists but belongs to someone else.
    io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

impl ControlSink for SignalSender {
    fn send(&self, action: ControlAction) -> Result<(), ControlError> {
        let Some(pid) = self.pid else {
            return Err(ControlError::NoTarget);
        };
        if !process_exists(pid) {
            return Err(ControlError::ProcessUnreachable {
                target: format!("pid {pid}"),
            });
        }
        // SAFETY: plain kill(2) with a validated signal number.
        if unsafe { libc::kill(pid, action.signal()) } != 0 {
            let source = io::Error::last_os_error();
            if source.raw_os_error() == Some(libc::ESRCH) {
                return Err(ControlError::ProcessUnreachable {
                    target: format!("pid {pid}"),
                });
            }
            return Err(ControlError::Delivery {
                action,
                target: format!("pid {pid}"),
                source,
            });
        }
        tracing::debug!(pid, %action, signal = action.signal_name(), "control signal sent");
        Ok(())
    }

    fn target(&self) -> String {
        match self.pid {
            Some(pid) => format!("pid {pid}"),
            None => "no robot".to_string(),
        }
    }
}

/// In-process sink over a bounded channel. A full channel drops the action
/// (like a coalesced signal); a dropped receiver reads as "process gone".
#[derive(Clone)]
pub struct LoopbackSink {
    tx: Sender<ControlAction>,
}

impl LoopbackSink {
    pub fn new(tx: Sender<ControlAction>) -> Self {
        Self { tx }
    }
}

impl ControlSink for LoopbackSink {
    fn send(&self, action: ControlAction) -> Result<(), ControlError> {
        match self.tx.try_send(action) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::debug!(%action, "loopback control channel full; action dropped");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(ControlError::ProcessUnreachable {
                target: self.target(),
            }),
        }
    }

    fn target(&self) -> String {
        "loopback".to_string()
    }
}

/// Bounded loopback pair for wiring both ends inside one process.
pub fn loopback(capacity: usize) -> (LoopbackSink, crossbeam_channel::Receiver<ControlAction>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (LoopbackSink::new(tx), rx)
}
