//! Event counters a consumer polls to learn about legacy-line interrupts.
//!
//! Each registered device owns one [`UioEvent`]. The interrupt path bumps the
//! counter when the driver handler reports `Handled`, and the consumer
//! compares the counter with the last value it saw, the way a read on a UIO
//! device node returns the event count.

use core::sync::atomic::{AtomicU32, Ordering};

/// Per-device interrupt event counter.
#[derive(Debug, Default)]
pub struct UioEvent {
    count: AtomicU32,
}

impl UioEvent {
    /// Creates a counter at zero.
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Records one interrupt. Safe to call from interrupt context.
    #[inline]
    pub fn notify(&self) {
        self.count.fetch_add(1, Ordering::Release);
    }

    /// Gets the number of interrupts recorded so far (wrapping).
    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    /// Returns the current count if it differs from `last_seen`.
    ///
    /// This is the readiness check behind a consumer's poll: `None` means
    /// nothing fired since the consumer last looked.
    #[inline]
    pub fn poll(&self, last_seen: u32) -> Option<u32> {
        let current = self.count();
        if current != last_seen {
            Some(current)
        } else {
            None
        }
    }
}
