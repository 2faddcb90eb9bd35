use std::sync::{Mutex, MutexGuard};

/// Take a mutex even if a worker panicked while holding it. Every shared
/// state struct in this crate stays internally consistent between field
/// writes, so the poisoned value is still usable.
pub(crate) fn lock_or_recover<'a, T>(lock: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!(context, "mutex poisoned; recovering");
            poisoned.into_inner()
        }
    }
}
