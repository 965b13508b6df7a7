#![no_std]

//! # Generic UIO interrupt forwarding for PCI devices
//!
//! This crate lets a userspace consumer drive the interrupts of an otherwise
//! unmanaged PCI device. It is designed for `no_std` environments and uses the
//! `alloc` crate for dynamic memory allocation.
//!
//! ## Architecture
//!
//! ### Claim and Lifecycle
//! - [`UioBinding`]: Claims a device, serves control requests, tears down
//! - [`BindingLifecycle`]: State machine (Claimed/Releasing/TornDown) with access tracking
//! - [`InterruptMode`]: Legacy INTx line or MSI-X vector table, chosen at claim
//!
//! ### Interrupt Forwarding
//! - [`LegacyLineHandler`]: Claims shared-line interrupts by masking INTx at the device
//! - [`VectorHandler`]: Signals the notifier bound to one MSI-X vector
//! - [`NotificationRegistry`]: Vector-to-notifier bindings with safe rebinding
//! - [`VectorTable`]: Enabled MSI-X vectors
//!
//! ### Collaborators
//! - [`PciDevice`], [`IrqPlatform`]: The device and the interrupt controller
//! - [`UioExposer`]: Publishes devices to consumers, with [`UioCore`] as the in-kernel one
//! - [`NotifierLookup`]: Resolves consumer ids to [`EventNotifier`]s, e.g. [`NotifierTable`]
//!
//! ## Features
//!
//! - `msix` (default): Forward MSI-X vectors. Without it, devices lacking a
//!   legacy line are refused.
//!
//! ## Examples
//!
//! ### Claiming a Device
//!
//! ```rust,ignore
//! use axuio::{ClaimConfig, NotifierTable, UioBinding, UioCore};
//!
//! let core = Arc::new(UioCore::new(platform.clone()));
//! let fds = Arc::new(NotifierTable::new());
//!
//! // On probe
//! let binding = UioBinding::claim(pci_dev, platform, core, fds.clone(), ClaimConfig::default())?;
//!
//! // Bind an eventfd to MSI-X vector 0
//! let efd = Arc::new(EventFd::new());
//! let fd = fds.install(efd.clone());
//! assert_eq!(binding.ioctl(UIO_MSIX_DATA, &UioMsixData { fd, vector: 0 }), 0);
//!
//! // On close or remove; the two may race
//! binding.release();
//! ```
//!
//! ### Servicing a Legacy Line
//!
//! ```rust,ignore
//! let mut seen = 0;
//! loop {
//!     if let Some(count) = binding.event().poll(seen) {
//!         seen = count;
//!         service_device();
//!         // INTx stays masked until re-armed
//!         binding.irqcontrol(true)?;
//!     }
//! }
//! ```

extern crate alloc;
#[macro_use]
extern crate log;

mod binding;
mod config;
mod control;
mod error;
mod exposer;
mod hal;
mod handler;
mod lifecycle;
mod mode;
mod registry;
mod stats;
mod vector;
pub mod notify;

#[cfg(test)]
mod testing;

pub use binding::UioBinding;
pub use config::{
    ClaimConfig, UioDriverInfo, DRIVER_DESC, DRIVER_NAME, DRIVER_VERSION, VECTOR_IRQ_NAME,
};
pub use control::{UioMsixData, UIO_MSIX_DATA};
pub use error::{UioError, UioResult};
pub use exposer::{UioCore, UioExposer, UioHandle, UioInfo};
pub use hal::{IrqCookie, IrqFlags, IrqHandler, IrqPlatform, IrqReturn, MsixEntry, PciDevice};
pub use handler::{LegacyLineHandler, VectorHandler};
pub use lifecycle::{AccessGuard, BindingLifecycle, BindingState};
pub use mode::InterruptMode;
pub use registry::NotificationRegistry;
pub use stats::IrqStats;
pub use vector::{VectorSlot, VectorTable, MAX_MSIX_VECTORS};

// Re-export notifier types
pub use notify::{EventFd, EventNotifier, NotifierLookup, NotifierTable, UioEvent};
