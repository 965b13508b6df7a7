//! MSI-X vector table allocation.
//!
//! A [`VectorTable`] pairs each MSI-X table entry with the platform vector
//! assigned to it and with the notifier currently bound to it. The table is
//! sized once from the count the device advertises and never resized.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::error::{UioError, UioResult};
use crate::hal::{IrqCookie, MsixEntry, PciDevice};
use crate::notify::EventNotifier;

/// Largest MSI-X table a PCI function can advertise.
pub const MAX_MSIX_VECTORS: usize = 2048;

/// A notifier bound to a slot together with the registration that delivers
/// to it.
pub(crate) struct SlotBinding {
    pub(crate) notifier: Arc<dyn EventNotifier>,
    pub(crate) cookie: IrqCookie,
}

/// One MSI-X table entry and its optional notifier.
pub struct VectorSlot {
    entry: MsixEntry,
    pub(crate) binding: Option<SlotBinding>,
}

impl VectorSlot {
    /// Index of this slot in the device's MSI-X table.
    #[inline]
    pub fn entry(&self) -> u16 {
        self.entry.entry
    }

    /// Platform interrupt number assigned to this slot.
    #[inline]
    pub fn vector(&self) -> u32 {
        self.entry.vector
    }

    /// Whether a notifier is bound.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// The bound notifier, if any.
    pub fn notifier(&self) -> Option<&Arc<dyn EventNotifier>> {
        self.binding.as_ref().map(|b| &b.notifier)
    }
}

impl core::fmt::Debug for VectorSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VectorSlot")
            .field("entry", &self.entry.entry)
            .field("vector", &self.entry.vector)
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Fixed-length table of vector slots.
#[derive(Debug)]
pub struct VectorTable {
    slots: Vec<VectorSlot>,
}

impl VectorTable {
    /// Enables exactly `count` MSI-X vectors on `device` and returns a table
    /// of unbound slots for them.
    ///
    /// All or nothing: if the device grants fewer vectors than requested,
    /// MSI-X is disabled again before the error is returned.
    ///
    /// # Errors
    ///
    /// - [`UioError::Allocation`] if table memory cannot be reserved or the
    ///   platform grants fewer than `count` vectors.
    /// - [`UioError::Capability`] if `count` is zero or too large, or the
    ///   device rejects MSI-X outright.
    pub fn allocate(device: &dyn PciDevice, count: usize) -> UioResult<Self> {
        if count == 0 || count > MAX_MSIX_VECTORS {
            warn!("{}: cannot allocate {} MSI-X vectors", device.name(), count);
            return Err(UioError::Capability);
        }

        let mut entries: Vec<MsixEntry> = Vec::new();
        entries
            .try_reserve_exact(count)
            .map_err(|_| UioError::Allocation)?;
        let mut slots: Vec<VectorSlot> = Vec::new();
        slots
            .try_reserve_exact(count)
            .map_err(|_| UioError::Allocation)?;

        entries.extend((0..count).map(|i| MsixEntry {
            entry: i as u16,
            vector: 0,
        }));

        match device.enable_msix(&mut entries) {
            Err(err) => {
                device.disable_msix();
                warn!("{}: MSI-X enable failed: {:?}", device.name(), err);
                return Err(UioError::Capability);
            }
            Ok(granted) if granted < count => {
                device.disable_msix();
                warn!(
                    "{}: only {} of {} MSI-X vectors granted",
                    device.name(),
                    granted,
                    count
                );
                return Err(UioError::Allocation);
            }
            Ok(_) => {}
        }

        slots.extend(entries.into_iter().map(|entry| VectorSlot {
            entry,
            binding: None,
        }));
        debug!("{}: {} MSI-X vectors enabled", device.name(), count);
        Ok(Self { slots })
    }

    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table has no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Gets a slot by index.
    pub fn slot(&self, index: usize) -> Option<&VectorSlot> {
        self.slots.get(index)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut VectorSlot> {
        self.slots.get_mut(index)
    }

    /// Iterates over all slots in table order.
    pub fn iter(&self) -> impl Iterator<Item = &VectorSlot> {
        self.slots.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut VectorSlot> {
        self.slots.iter_mut()
    }

    /// Number of slots with a bound notifier.
    pub fn bound_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_bound()).count()
    }
}
