//! Interrupt mode selection.
//!
//! A claimed device is driven either through its shared legacy INTx line or
//! through an MSI-X vector table, never both. The choice is made once, at
//! claim time, from what the device reports.

use alloc::sync::Arc;

use crate::config::ClaimConfig;
use crate::error::{UioError, UioResult};
use crate::hal::{IrqPlatform, PciDevice};
use crate::registry::NotificationRegistry;
use crate::stats::IrqStats;

/// The interrupt configuration of a claimed device.
pub enum InterruptMode {
    /// A shared INTx line, masked at the device by the line handler.
    LegacyLine {
        /// Platform interrupt number of the line.
        irq: u32,
    },
    /// MSI-X vectors with per-vector notifiers.
    VectorTable(NotificationRegistry),
}

impl InterruptMode {
    /// Picks and configures the interrupt mode for `device`.
    ///
    /// # Errors
    ///
    /// - [`UioError::UnsupportedDevice`] if the device has a legacy line but
    ///   cannot mask it at the device.
    /// - [`UioError::Capability`] or [`UioError::Allocation`] if the device has
    ///   no line and its vectors cannot be enabled.
    pub fn select(
        device: &Arc<dyn PciDevice>,
        platform: &Arc<dyn IrqPlatform>,
        stats: &Arc<IrqStats>,
        config: &ClaimConfig,
    ) -> UioResult<Self> {
        if let Some(irq) = device.irq() {
            // Sharing the line is only safe if we can tell our interrupts apart.
            if !device.intx_mask_supported() {
                warn!("{}: INTx masking not supported", device.name());
                return Err(UioError::UnsupportedDevice);
            }
            debug!("{}: using legacy line {}", device.name(), irq);
            return Ok(Self::LegacyLine { irq });
        }
        select_vectors(device, platform, stats, config)
    }

    /// Whether this is the legacy line mode.
    #[inline]
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::LegacyLine { .. })
    }

    /// The legacy line, in legacy mode.
    pub fn legacy_irq(&self) -> Option<u32> {
        match self {
            Self::LegacyLine { irq } => Some(*irq),
            Self::VectorTable(_) => None,
        }
    }

    /// The vector registry, in vector mode.
    pub fn registry(&self) -> Option<&NotificationRegistry> {
        match self {
            Self::LegacyLine { .. } => None,
            Self::VectorTable(registry) => Some(registry),
        }
    }

    /// Number of addressable vectors. Zero in legacy mode.
    pub fn vector_count(&self) -> usize {
        self.registry().map_or(0, NotificationRegistry::len)
    }

    /// Stops all interrupt delivery for this mode.
    ///
    /// Legacy mode masks INTx at the device; vector mode unbinds every
    /// notifier and disables MSI-X. Idempotent.
    pub(crate) fn deconfigure(&self, device: &dyn PciDevice) {
        match self {
            Self::LegacyLine { irq } => {
                device.set_intx(false);
                debug!("{}: legacy line {} masked", device.name(), irq);
            }
            Self::VectorTable(registry) => registry.disable(),
        }
    }
}

impl core::fmt::Debug for InterruptMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::LegacyLine { irq } => f.debug_struct("LegacyLine").field("irq", irq).finish(),
            Self::VectorTable(registry) => f.debug_tuple("VectorTable").field(registry).finish(),
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "msix")] {
        fn select_vectors(
            device: &Arc<dyn PciDevice>,
            platform: &Arc<dyn IrqPlatform>,
            stats: &Arc<IrqStats>,
            config: &ClaimConfig,
        ) -> UioResult<InterruptMode> {
            use crate::vector::VectorTable;

            let count = device.msix_vec_count();
            let table = VectorTable::allocate(&**device, count)?;
            info!("{}: MSI-X is enabled for UIO device", device.name());
            Ok(InterruptMode::VectorTable(NotificationRegistry::new(
                Arc::clone(device),
                Arc::clone(platform),
                table,
                Arc::clone(stats),
                config.vector_irq_name,
            )))
        }
    } else {
        fn select_vectors(
            device: &Arc<dyn PciDevice>,
            _platform: &Arc<dyn IrqPlatform>,
            _stats: &Arc<IrqStats>,
            _config: &ClaimConfig,
        ) -> UioResult<InterruptMode> {
            warn!("{}: no IRQ assigned to device: no support for interrupts?", device.name());
            Err(UioError::Capability)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockIrqPlatform, MockPciDevice};

    fn select(device: MockPciDevice) -> (Arc<MockPciDevice>, UioResult<InterruptMode>) {
        let device = Arc::new(device);
        let dyn_device: Arc<dyn PciDevice> = device.clone();
        let platform: Arc<dyn IrqPlatform> = Arc::new(MockIrqPlatform::new());
        let mode = InterruptMode::select(
            &dyn_device,
            &platform,
            &Arc::new(IrqStats::new()),
            &ClaimConfig::default(),
        );
        (device, mode)
    }

    #[test]
    fn test_select_legacy() {
        let (_, mode) = select(MockPciDevice::legacy(11));
        let mode = mode.unwrap();
        assert!(mode.is_legacy());
        assert_eq!(mode.legacy_irq(), Some(11));
        assert_eq!(mode.vector_count(), 0);
    }

    #[test]
    fn test_select_legacy_without_mask_refused() {
        let (device, mode) = select(MockPciDevice::legacy(11).without_intx_mask());
        assert_eq!(mode.unwrap_err(), UioError::UnsupportedDevice);
        assert!(!device.msix_enabled());
    }

    #[cfg(feature = "msix")]
    #[test]
    fn test_select_vectors() {
        let (device, mode) = select(MockPciDevice::msix(4));
        let mode = mode.unwrap();
        assert!(!mode.is_legacy());
        assert_eq!(mode.vector_count(), 4);
        assert!(device.msix_enabled());

        mode.deconfigure(&*device);
        assert!(!device.msix_enabled());
    }

    #[cfg(feature = "msix")]
    #[test]
    fn test_select_vectors_rejected() {
        let (device, mode) = select(MockPciDevice::msix(4).rejecting_msix());
        assert_eq!(mode.unwrap_err(), UioError::Capability);
        assert!(!device.msix_enabled());
    }

    #[test]
    fn test_deconfigure_legacy_masks() {
        let (device, mode) = select(MockPciDevice::legacy(5));
        mode.unwrap().deconfigure(&*device);
        assert!(device.intx_masked());
    }
}
