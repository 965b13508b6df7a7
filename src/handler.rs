//! Interrupt-context handlers.
//!
//! Both handlers run with interrupts disabled on the local CPU, possibly on
//! several CPUs at once. They touch only atomics and the device's own
//! registers; nothing here allocates or blocks.

use alloc::sync::Arc;

use crate::hal::{IrqHandler, IrqReturn, PciDevice};
use crate::notify::EventNotifier;
use crate::stats::IrqStats;

/// Handler for a shared legacy INTx line.
///
/// Masks INTx at the device when the device reports it pending. The consumer
/// is woken by the exposer on `Handled` and must unmask through
/// [`UioBinding::irqcontrol`](crate::UioBinding::irqcontrol) before the
/// device can interrupt again.
pub struct LegacyLineHandler {
    device: Arc<dyn PciDevice>,
    stats: Arc<IrqStats>,
}

impl LegacyLineHandler {
    /// Creates a handler for `device`.
    pub fn new(device: Arc<dyn PciDevice>, stats: Arc<IrqStats>) -> Self {
        Self { device, stats }
    }
}

impl IrqHandler for LegacyLineHandler {
    fn handle(&self, irq: u32) -> IrqReturn {
        // Another device on the line may have raised it.
        if !self.device.check_and_mask_intx() {
            self.stats.record_not_mine();
            return IrqReturn::NotMine;
        }
        trace!("{}: INTx {} masked", self.device.name(), irq);
        self.stats.record_handled();
        IrqReturn::Handled
    }
}

/// Handler for one MSI-X vector.
///
/// Closed over the notifier bound to the slot when the handler was
/// registered. The registry deregisters the handler before it drops the
/// slot's reference, so a superseded notifier is never signalled once a
/// rebind has returned.
pub struct VectorHandler {
    notifier: Arc<dyn EventNotifier>,
    stats: Arc<IrqStats>,
}

impl VectorHandler {
    /// Creates a handler that signals `notifier`.
    pub fn new(notifier: Arc<dyn EventNotifier>, stats: Arc<IrqStats>) -> Self {
        Self { notifier, stats }
    }
}

impl IrqHandler for VectorHandler {
    #[inline]
    fn handle(&self, _irq: u32) -> IrqReturn {
        self.notifier.signal(1);
        self.stats.record_signal();
        IrqReturn::Handled
    }
}
