//! Cooperative shutdown flag shared by every long-lived worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep any worker performs, so shutdown is noticed promptly.
pub const MAX_SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Process-wide "keep running" flag. Cloning shares the same flag.
#[derive(Clone, Debug)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Sleep for `duration` in bounded slices. Returns `false` when shutdown
    /// was requested before the full duration elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if !self.is_running() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(MAX_SLEEP_SLICE));
        }
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}
