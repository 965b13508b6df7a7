//! Interrupt statistics, updated lock-free from interrupt context.

use core::sync::atomic::{AtomicU64, Ordering};

/// Counters for one binding.
#[derive(Debug, Default)]
pub struct IrqStats {
    /// Legacy-line deliveries that this device raised.
    pub handled_count: AtomicU64,
    /// Legacy-line deliveries raised by some other device on the line.
    pub not_mine_count: AtomicU64,
    /// Vector deliveries forwarded to a notifier.
    pub signal_count: AtomicU64,
}

impl IrqStats {
    /// Creates a zeroed statistics tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a handled legacy interrupt.
    #[inline]
    pub fn record_handled(&self) {
        self.handled_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a legacy interrupt that belonged to another device.
    #[inline]
    pub fn record_not_mine(&self) {
        self.not_mine_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a notifier signal.
    #[inline]
    pub fn record_signal(&self) {
        self.signal_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the number of handled legacy interrupts.
    #[inline]
    pub fn handled(&self) -> u64 {
        self.handled_count.load(Ordering::Relaxed)
    }

    /// Gets the number of legacy interrupts that were not ours.
    #[inline]
    pub fn not_mine(&self) -> u64 {
        self.not_mine_count.load(Ordering::Relaxed)
    }

    /// Gets the number of notifier signals.
    #[inline]
    pub fn signals(&self) -> u64 {
        self.signal_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_counters() {
        let stats = IrqStats::new();
        stats.record_handled();
        stats.record_not_mine();
        stats.record_not_mine();
        stats.record_signal();
        assert_eq!(stats.handled(), 1);
        assert_eq!(stats.not_mine(), 2);
        assert_eq!(stats.signals(), 1);
    }
}
