/// Name the binding registers under.
pub const DRIVER_NAME: &str = "uio_pci_generic";
/// Driver version reported to the exposer.
pub const DRIVER_VERSION: &str = "0.01.0";
/// One-line driver description.
pub const DRIVER_DESC: &str = "Generic UIO driver for PCI 2.3 devices";
/// Label attached to MSI-X vector registrations.
pub const VECTOR_IRQ_NAME: &str = "UIO IRQ";

/// Identification reported through the exposer. Not consulted for behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UioDriverInfo {
    /// Driver name.
    pub name: &'static str,
    /// Driver version.
    pub version: &'static str,
    /// Driver description.
    pub description: &'static str,
}

impl Default for UioDriverInfo {
    fn default() -> Self {
        Self {
            name: DRIVER_NAME,
            version: DRIVER_VERSION,
            description: DRIVER_DESC,
        }
    }
}

/// Per-claim settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimConfig {
    /// Identification passed to the exposer.
    pub driver: UioDriverInfo,
    /// Label for MSI-X vector registrations.
    pub vector_irq_name: &'static str,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            driver: UioDriverInfo::default(),
            vector_irq_name: VECTOR_IRQ_NAME,
        }
    }
}
