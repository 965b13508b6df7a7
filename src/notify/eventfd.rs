//! Counting notifiers signalled from interrupt context.

use core::sync::atomic::{AtomicU64, Ordering};

/// A signalling object a consumer waits on.
///
/// The binding subsystem only ever signals a notifier and drops its reference
/// to it. `signal` is called from interrupt context and must neither block
/// nor allocate.
pub trait EventNotifier: Send + Sync {
    /// Adds `count` to the notifier and wakes any waiter.
    fn signal(&self, count: u64);
}

/// An eventfd-like counting semaphore.
///
/// Signals accumulate until the consumer drains them with [`EventFd::read`].
/// The counter saturates one below `u64::MAX`, which an eventfd reserves.
#[derive(Debug, Default)]
pub struct EventFd {
    counter: AtomicU64,
}

impl EventFd {
    /// Largest value the counter can hold.
    pub const MAX: u64 = u64::MAX - 1;

    /// Creates a notifier with a zero counter.
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Returns the accumulated count and resets it, or `None` if nothing was
    /// signalled since the last read.
    pub fn read(&self) -> Option<u64> {
        match self.counter.swap(0, Ordering::AcqRel) {
            0 => None,
            count => Some(count),
        }
    }

    /// Returns the accumulated count without consuming it.
    #[inline]
    pub fn peek(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }
}

impl EventNotifier for EventFd {
    #[inline]
    fn signal(&self, count: u64) {
        let _ = self
            .counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(count).min(Self::MAX))
            });
    }
}
