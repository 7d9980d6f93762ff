//! Re-entrancy guard for timer-driven loops.

use std::sync::atomic::{AtomicBool, Ordering};

/// Holds a busy flag for the duration of one tick.
///
/// The flag is cleared on drop, including when the tick returns early or
/// its future is cancelled.
pub(crate) struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    /// Set `flag`, or return `None` if it was already set.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
