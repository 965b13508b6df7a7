//! The exposing layer: publishes a claimed device to its consumer.
//!
//! The exposer owns the legacy line registration. It installs the driver's
//! line handler on the platform and, whenever that handler reports
//! [`IrqReturn::Handled`], bumps the device's [`UioEvent`] so that a
//! consumer polling the device wakes up.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

use axerrno::{ax_err, AxResult};
use spin::RwLock;

use crate::hal::{IrqCookie, IrqFlags, IrqHandler, IrqPlatform, IrqReturn};
use crate::notify::UioEvent;

/// What a driver registers with the exposer.
pub struct UioInfo {
    /// Driver name.
    pub name: &'static str,
    /// Driver version.
    pub version: &'static str,
    /// Legacy line the exposer should listen on, if any.
    pub irq: Option<u32>,
    /// Flags for the line registration.
    pub irq_flags: IrqFlags,
    /// Driver handler invoked on every delivery of `irq`.
    pub handler: Option<Arc<dyn IrqHandler>>,
}

impl core::fmt::Debug for UioInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UioInfo")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("irq", &self.irq)
            .field("irq_flags", &self.irq_flags)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// A registration made with a [`UioExposer`].
#[derive(Debug, Clone)]
pub struct UioHandle {
    minor: usize,
    event: Arc<UioEvent>,
}

impl UioHandle {
    /// Creates a handle for the device registered as `minor`.
    pub fn new(minor: usize, event: Arc<UioEvent>) -> Self {
        Self { minor, event }
    }

    /// Minor number the device was registered under.
    #[inline]
    pub fn minor(&self) -> usize {
        self.minor
    }

    /// The consumer's wait channel for legacy-line interrupts.
    #[inline]
    pub fn event(&self) -> &Arc<UioEvent> {
        &self.event
    }
}

/// Publishes devices to consumers.
pub trait UioExposer: Send + Sync {
    /// Publishes a device and arms its legacy line, if it has one.
    fn register(&self, info: UioInfo) -> AxResult<UioHandle>;

    /// Withdraws a device. The legacy line is released before this returns
    /// and its handler will not run again.
    fn unregister(&self, handle: &UioHandle);
}

/// Wraps a driver line handler so that `Handled` is counted as an event.
struct UioIrqAction {
    handler: Arc<dyn IrqHandler>,
    event: Arc<UioEvent>,
}

impl IrqHandler for UioIrqAction {
    fn handle(&self, irq: u32) -> IrqReturn {
        let ret = self.handler.handle(irq);
        if ret == IrqReturn::Handled {
            self.event.notify();
        }
        ret
    }
}

struct UioListing {
    name: &'static str,
    version: &'static str,
    line: Option<(u32, IrqCookie)>,
    event: Arc<UioEvent>,
}

/// In-kernel exposer keeping one event counter per published device.
pub struct UioCore {
    platform: Arc<dyn IrqPlatform>,
    devices: RwLock<BTreeMap<usize, UioListing>>,
    next_minor: AtomicUsize,
}

impl UioCore {
    /// Creates an exposer that registers legacy lines on `platform`.
    pub fn new(platform: Arc<dyn IrqPlatform>) -> Self {
        Self {
            platform,
            devices: RwLock::new(BTreeMap::new()),
            next_minor: AtomicUsize::new(0),
        }
    }

    /// Gets the event counter of a published device.
    pub fn event(&self, minor: usize) -> Option<Arc<UioEvent>> {
        self.devices.read().get(&minor).map(|d| Arc::clone(&d.event))
    }

    /// Gets the name and version a device was published with.
    pub fn info(&self, minor: usize) -> Option<(&'static str, &'static str)> {
        self.devices.read().get(&minor).map(|d| (d.name, d.version))
    }

    /// Gets the number of published devices.
    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }
}

impl UioExposer for UioCore {
    fn register(&self, info: UioInfo) -> AxResult<UioHandle> {
        let event = Arc::new(UioEvent::new());

        let line = match (info.irq, info.handler) {
            (Some(irq), Some(handler)) => {
                let action = Arc::new(UioIrqAction {
                    handler,
                    event: Arc::clone(&event),
                });
                let cookie = self
                    .platform
                    .request_irq(irq, info.irq_flags, info.name, action)?;
                Some((irq, cookie))
            }
            (Some(_), None) => return ax_err!(InvalidInput, "legacy line without a handler"),
            (None, _) => None,
        };

        let minor = self.next_minor.fetch_add(1, Ordering::Relaxed);
        self.devices.write().insert(
            minor,
            UioListing {
                name: info.name,
                version: info.version,
                line,
                event: Arc::clone(&event),
            },
        );
        debug!("uio{}: registered {} {} line={:?}", minor, info.name, info.version, info.irq);

        Ok(UioHandle::new(minor, event))
    }

    fn unregister(&self, handle: &UioHandle) {
        let Some(listing) = self.devices.write().remove(&handle.minor) else {
            warn!("uio{}: not registered", handle.minor);
            return;
        };
        if let Some((irq, cookie)) = listing.line {
            self.platform.free_irq(irq, cookie);
        }
        debug!("uio{}: unregistered", handle.minor);
    }
}
