use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::{
    io,
    sync::atomic::{AtomicBool, Ordering},
};

static RAW_MODE_ENABLED: AtomicBool = AtomicBool::new(false);

/// RAII guard that puts the terminal back into cooked mode on drop (and on
/// panic via the hook in `logging`). Used by the robot's local key input.
pub struct TerminalRestoreGuard;

impl TerminalRestoreGuard {
    pub fn new() -> Self {
        crate::logging::install_panic_hook();
        TerminalRestoreGuard
    }

    pub fn enable_raw_mode(&self) -> io::Result<()> {
        enable_raw_mode()?;
        RAW_MODE_ENABLED.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn restore(&self) {
        restore_terminal();
    }
}

impl Default for TerminalRestoreGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TerminalRestoreGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

/// Leave raw mode if we entered it. Safe to call any number of times.
pub fn restore_terminal() {
    if RAW_MODE_ENABLED.swap(false, Ordering::SeqCst) {
        let _ = disable_raw_mode();
    }
}
