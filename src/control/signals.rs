//! Robot-side end of the control channel.
//!
//! Handlers run in signal context, so all they do is set one bit in a static
//! mask. A dispatcher thread drains the mask and applies the actions under the
//! normal state lock. Two raises of the same signal before a drain collapse
//! into one action; that matches what the kernel does for pending signals.

use super::{ControlAction, ControlError};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

static PENDING: AtomicU32 = AtomicU32::new(0);
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_control_signal(signo: libc::c_int) {
    if let Some(action) = ControlAction::from_signal(signo) {
        PENDING.fetch_or(action.bit(), Ordering::SeqCst);
    }
}

extern "C" fn on_shutdown_signal(_: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

fn install(
    signo: libc::c_int,
    name: &'static str,
    handler: extern "C" fn(libc::c_int),
) -> Result<(), ControlError> {
    unsafe {
        // SAFETY: both handlers only touch atomics, which is async-signal-safe.
        let handler = handler as *const () as libc::sighandler_t;
        if libc::signal(signo, handler) == libc::SIG_ERR {
            return Err(ControlError::HandlerInstall {
                signal: name,
                source: io::Error::last_os_error(),
            });
        }
    }
    Ok(())
}

/// Proof that the control handlers are installed; the only way to drain them.
pub struct SignalReceiver {
    _installed: (),
}

impl SignalReceiver {
    /// Bind every `ControlAction` to its signal. Failing here is fatal for the
    /// robot process, since it would otherwise die on the first raise.
    pub fn install() -> Result<Self, ControlError> {
        for action in ControlAction::ALL {
            install(action.signal(), action.signal_name(), on_control_signal)?;
        }
        tracing::debug!("control signal handlers installed");
        Ok(Self { _installed: () })
    }

    /// Take every action raised since the last call, in `ControlAction::ALL` order.
    pub fn take_pending(&self) -> Vec<ControlAction> {
        decode_mask(PENDING.swap(0, Ordering::SeqCst))
    }
}

pub(crate) fn decode_mask(mask: u32) -> Vec<ControlAction> {
    ControlAction::ALL
        .into_iter()
        .filter(|action| mask & action.bit() != 0)
        .collect()
}

/// Route SIGINT/SIGTERM to a flag the main loop polls.
pub fn install_shutdown_handler() -> Result<(), ControlError> {
    install(libc::SIGINT, "SIGINT", on_shutdown_signal)?;
    install(libc::SIGTERM, "SIGTERM", on_shutdown_signal)
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
