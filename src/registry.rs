//! Vector-to-notifier registry.
//!
//! The registry is the only place where the control path and the interrupt
//! path meet. Interrupt handlers never look at the table: each registered
//! [`VectorHandler`] carries its own reference to the notifier it signals.
//! The control path mutates the table under a single lock and relies on
//! [`IrqPlatform::free_irq`] to wait out in-flight handlers.
//!
//! # Rebind Protocol
//!
//! ```text
//! bind(i, new)
//!   ├─ free_irq(vector[i], old.cookie)   no handler for `old` runs past here
//!   ├─ drop(old.notifier)                registry's reference released
//!   └─ request_irq(vector[i], handler(new))
//! ```
//!
//! A notifier is therefore never released while an interrupt for its slot can
//! still reach it, and once `bind` returns only the new notifier is signalled.

use alloc::sync::Arc;

use spin::Mutex;

use crate::error::{UioError, UioResult};
use crate::handler::VectorHandler;
use crate::hal::{IrqFlags, IrqHandler, IrqPlatform, PciDevice};
use crate::notify::{EventNotifier, NotifierLookup};
use crate::stats::IrqStats;
use crate::vector::{SlotBinding, VectorSlot, VectorTable};

struct RegistryState {
    table: VectorTable,
    /// Cleared once the consumer disables vector delivery.
    delivery_enabled: bool,
}

/// Registry of notifiers bound to MSI-X vectors.
pub struct NotificationRegistry {
    device: Arc<dyn PciDevice>,
    platform: Arc<dyn IrqPlatform>,
    stats: Arc<IrqStats>,
    irq_name: &'static str,
    /// Serializes all control-path mutations. Never taken in interrupt context.
    state: Mutex<RegistryState>,
}

impl NotificationRegistry {
    /// Creates a registry over an allocated vector table.
    pub fn new(
        device: Arc<dyn PciDevice>,
        platform: Arc<dyn IrqPlatform>,
        table: VectorTable,
        stats: Arc<IrqStats>,
        irq_name: &'static str,
    ) -> Self {
        Self {
            device,
            platform,
            stats,
            irq_name,
            state: Mutex::new(RegistryState {
                table,
                delivery_enabled: true,
            }),
        }
    }

    /// Number of vector slots.
    pub fn len(&self) -> usize {
        self.state.lock().table.len()
    }

    /// Whether the table has no slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether vector delivery is still enabled.
    pub fn delivery_enabled(&self) -> bool {
        self.state.lock().delivery_enabled
    }

    /// Platform vector of slot `index`.
    pub fn vector(&self, index: usize) -> Option<u32> {
        self.state.lock().table.slot(index).map(VectorSlot::vector)
    }

    /// Whether slot `index` has a bound notifier.
    pub fn is_bound(&self, index: usize) -> bool {
        self.state
            .lock()
            .table
            .slot(index)
            .is_some_and(VectorSlot::is_bound)
    }

    /// Number of slots with a bound notifier.
    pub fn bound_count(&self) -> usize {
        self.state.lock().table.bound_count()
    }

    /// Binds `notifier` to slot `index`, replacing any notifier bound before.
    ///
    /// # Errors
    ///
    /// - [`UioError::OutOfRange`] if `index` is not a slot; nothing changes.
    /// - [`UioError::DeliveryDisabled`] after [`NotificationRegistry::disable`].
    /// - [`UioError::Platform`] if the vector could not be requested. The old
    ///   notifier has been released by then and the slot is left unbound.
    pub fn bind(&self, index: usize, notifier: Arc<dyn EventNotifier>) -> UioResult {
        let mut state = self.state.lock();
        if index >= state.table.len() {
            return Err(UioError::OutOfRange);
        }
        if !state.delivery_enabled {
            return Err(UioError::DeliveryDisabled);
        }
        let slot = state.table.slot_mut(index).ok_or(UioError::OutOfRange)?;
        let vector = slot.vector();

        if let Some(old) = slot.binding.take() {
            self.platform.free_irq(vector, old.cookie);
            drop(old);
            debug!("{}: vector {} unbound", self.device.name(), index);
        }

        let handler: Arc<dyn IrqHandler> =
            Arc::new(VectorHandler::new(Arc::clone(&notifier), Arc::clone(&self.stats)));
        match self
            .platform
            .request_irq(vector, IrqFlags::empty(), self.irq_name, handler)
        {
            Ok(cookie) => {
                slot.binding = Some(SlotBinding { notifier, cookie });
                debug!(
                    "{}: vector {} (irq {}) bound",
                    self.device.name(),
                    index,
                    vector
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "{}: request for irq {} failed: {:?}",
                    self.device.name(),
                    vector,
                    err
                );
                Err(UioError::Platform(err))
            }
        }
    }

    /// Resolves `id` through `lookup` and binds the result to slot `index`.
    ///
    /// A negative `id` disables vector delivery altogether instead.
    ///
    /// # Errors
    ///
    /// As [`NotificationRegistry::bind`], plus [`UioError::InvalidHandle`] if
    /// `id` does not resolve. The slot is untouched in that case.
    pub fn bind_notification(&self, index: u32, id: i32, lookup: &dyn NotifierLookup) -> UioResult {
        if id < 0 {
            self.disable();
            return Ok(());
        }
        if index as usize >= self.len() {
            return Err(UioError::OutOfRange);
        }
        let notifier = lookup.lookup(id).ok_or(UioError::InvalidHandle)?;
        self.bind(index as usize, notifier)
    }

    /// Releases the notifier bound to slot `index`, if any.
    pub fn unbind(&self, index: usize) -> UioResult {
        let mut state = self.state.lock();
        let slot = state.table.slot_mut(index).ok_or(UioError::OutOfRange)?;
        if let Some(old) = slot.binding.take() {
            self.platform.free_irq(slot.vector(), old.cookie);
            drop(old);
            debug!("{}: vector {} unbound", self.device.name(), index);
        }
        Ok(())
    }

    /// Deregisters every vector handler, then releases every notifier.
    pub fn unbind_all(&self) {
        let mut state = self.state.lock();
        Self::release_all(&*self.platform, &mut state.table);
    }

    /// Unbinds everything and disables MSI-X on the device.
    ///
    /// Further binds fail with [`UioError::DeliveryDisabled`]. Idempotent.
    pub fn disable(&self) {
        let mut state = self.state.lock();
        if !state.delivery_enabled {
            return;
        }
        Self::release_all(&*self.platform, &mut state.table);
        self.device.disable_msix();
        state.delivery_enabled = false;
        info!("{}: MSI-X delivery disabled", self.device.name());
    }

    fn release_all(platform: &dyn IrqPlatform, table: &mut VectorTable) {
        // Every handler is gone before the first notifier is dropped.
        for slot in table.iter() {
            if let Some(binding) = &slot.binding {
                platform.free_irq(slot.vector(), binding.cookie);
            }
        }
        for slot in table.iter_mut() {
            slot.binding = None;
        }
    }
}

impl core::fmt::Debug for NotificationRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("NotificationRegistry")
            .field("len", &state.table.len())
            .field("bound", &state.table.bound_count())
            .field("delivery_enabled", &state.delivery_enabled)
            .finish()
    }
}
