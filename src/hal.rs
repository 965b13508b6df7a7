//! Collaborator interfaces the binding subsystem is built against.
//!
//! The PCI bus layer and the interrupt controller are external to this crate.
//! They are expressed as object-safe traits so that a kernel can plug in its
//! real implementation and tests can plug in simulated hardware.

use alloc::sync::Arc;

use axerrno::AxResult;
use bitflags::bitflags;

bitflags! {
    /// Flags passed along with an interrupt registration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IrqFlags: u32 {
        /// The line may be shared with other devices.
        const SHARED = 1 << 7;
    }
}

/// Outcome of an interrupt handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// The interrupt was not raised by this device.
    NotMine,
    /// The interrupt was raised by this device and has been acknowledged.
    Handled,
}

/// A routine invoked by the platform in interrupt context.
///
/// Implementations must not block or allocate.
pub trait IrqHandler: Send + Sync {
    /// Handles one delivery of `irq`.
    fn handle(&self, irq: u32) -> IrqReturn;
}

/// Identifies one registration made through [`IrqPlatform::request_irq`].
///
/// Shared lines carry several registrations; the cookie selects which one
/// [`IrqPlatform::free_irq`] removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IrqCookie(pub usize);

/// The interrupt controller side of the platform.
pub trait IrqPlatform: Send + Sync {
    /// Installs `handler` on `irq`.
    fn request_irq(
        &self,
        irq: u32,
        flags: IrqFlags,
        name: &'static str,
        handler: Arc<dyn IrqHandler>,
    ) -> AxResult<IrqCookie>;

    /// Removes a registration.
    ///
    /// Must not return while an invocation of the removed handler is still
    /// running on any CPU, and must drop the platform's reference to the
    /// handler before returning.
    fn free_irq(&self, irq: u32, cookie: IrqCookie);
}

/// One MSI-X table entry: the table index and the vector the platform
/// assigned to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsixEntry {
    /// Index into the device's MSI-X table.
    pub entry: u16,
    /// Platform interrupt number, filled in by [`PciDevice::enable_msix`].
    pub vector: u32,
}

/// The PCI bus side of the platform, for one function.
pub trait PciDevice: Send + Sync {
    /// Bus address used in log messages, e.g. `0000:00:19.0`.
    fn name(&self) -> &str;

    /// Enables I/O and memory decoding.
    fn enable_device(&self) -> AxResult;

    /// Reverses [`PciDevice::enable_device`].
    fn disable_device(&self);

    /// The legacy INTx line, if one is routed.
    fn irq(&self) -> Option<u32>;

    /// Whether the command register's INTx disable bit works independently of
    /// the status register's interrupt bit.
    fn intx_mask_supported(&self) -> bool;

    /// If the device reports INTx pending, masks INTx at the device and
    /// returns `true`. Returns `false` without side effects otherwise.
    ///
    /// The read-modify-write of the command register must be atomic with
    /// respect to other config space accesses.
    fn check_and_mask_intx(&self) -> bool;

    /// Sets (`enable == false`) or clears the INTx disable bit.
    fn set_intx(&self, enable: bool);

    /// Number of MSI-X table entries the device advertises.
    fn msix_vec_count(&self) -> usize;

    /// Enables MSI-X for `entries`, filling in each entry's vector.
    ///
    /// Returns how many entries were granted. Vectors are assigned in entry
    /// order; a short grant leaves MSI-X enabled for the granted prefix.
    fn enable_msix(&self, entries: &mut [MsixEntry]) -> AxResult<usize>;

    /// Disables MSI-X and returns every vector to the platform.
    fn disable_msix(&self);

    /// Clears the bus master enable bit.
    fn clear_master(&self);
}
