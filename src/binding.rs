//! Device claim, control path and teardown.
//!
//! [`UioBinding`] is what the bus framework holds between probe and remove,
//! and what the consumer's control calls reach. It owns the device, the
//! selected [`InterruptMode`] and the exposer registration.
//!
//! # Claim
//!
//! ```text
//! enable_device ─► select mode ─► (MSI-X: allocate + enable vectors) ─► exposer.register
//!       ▲                                      │                              │
//!       └──────────── unwound in reverse on any failure ◄─────────────────────┘
//! ```
//!
//! # Teardown
//!
//! `release` (consumer gone) and `teardown` (device removed) do the same work
//! and may race. Whichever starts first does it; the other waits for it to
//! finish.

use alloc::sync::Arc;

use arrayvec::ArrayVec;

use crate::config::{ClaimConfig, UioDriverInfo};
use crate::error::{UioError, UioResult};
use crate::exposer::{UioExposer, UioHandle, UioInfo};
use crate::hal::{IrqFlags, IrqHandler, IrqPlatform, PciDevice};
use crate::handler::LegacyLineHandler;
use crate::lifecycle::{BindingLifecycle, BindingState};
use crate::mode::InterruptMode;
use crate::notify::{EventNotifier, NotifierLookup, UioEvent};
use crate::stats::IrqStats;

/// Hardware enablement performed during claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClaimStep {
    DeviceEnabled,
    VectorsEnabled,
}

const MAX_CLAIM_STEPS: usize = 2;

/// Records claim steps and undoes them in reverse order unless committed.
struct ClaimJournal<'a> {
    device: &'a dyn PciDevice,
    steps: ArrayVec<ClaimStep, MAX_CLAIM_STEPS>,
}

impl<'a> ClaimJournal<'a> {
    fn new(device: &'a dyn PciDevice) -> Self {
        Self {
            device,
            steps: ArrayVec::new(),
        }
    }

    fn record(&mut self, step: ClaimStep) {
        self.steps.push(step);
    }

    fn commit(mut self) {
        self.steps.clear();
    }
}

impl Drop for ClaimJournal<'_> {
    fn drop(&mut self) {
        while let Some(step) = self.steps.pop() {
            debug!("{}: undoing {:?}", self.device.name(), step);
            match step {
                ClaimStep::VectorsEnabled => self.device.disable_msix(),
                ClaimStep::DeviceEnabled => self.device.disable_device(),
            }
        }
    }
}

/// A claimed device exposed to one consumer.
pub struct UioBinding {
    device: Arc<dyn PciDevice>,
    exposer: Arc<dyn UioExposer>,
    lookup: Arc<dyn NotifierLookup>,
    mode: InterruptMode,
    handle: UioHandle,
    driver: UioDriverInfo,
    stats: Arc<IrqStats>,
    lifecycle: BindingLifecycle,
}

impl UioBinding {
    /// Claims `device` and publishes it through `exposer`.
    ///
    /// Consumer-supplied notifier ids passed to
    /// [`UioBinding::bind_notification`] are resolved through `lookup`.
    ///
    /// # Errors
    ///
    /// Whatever [`InterruptMode::select`] or the collaborators report. Every
    /// step taken before the failure is undone, so the device is left as it
    /// was found.
    pub fn claim(
        device: Arc<dyn PciDevice>,
        platform: Arc<dyn IrqPlatform>,
        exposer: Arc<dyn UioExposer>,
        lookup: Arc<dyn NotifierLookup>,
        config: ClaimConfig,
    ) -> UioResult<Arc<Self>> {
        if let Err(err) = device.enable_device() {
            error!("{}: enable_device failed: {:?}", device.name(), err);
            return Err(UioError::Platform(err));
        }
        let mut journal = ClaimJournal::new(&*device);
        journal.record(ClaimStep::DeviceEnabled);

        let stats = Arc::new(IrqStats::new());
        let mode = InterruptMode::select(&device, &platform, &stats, &config)?;
        if !mode.is_legacy() {
            journal.record(ClaimStep::VectorsEnabled);
        }

        let handler = mode.legacy_irq().map(|_| {
            Arc::new(LegacyLineHandler::new(Arc::clone(&device), Arc::clone(&stats)))
                as Arc<dyn IrqHandler>
        });
        let info = UioInfo {
            name: config.driver.name,
            version: config.driver.version,
            irq: mode.legacy_irq(),
            irq_flags: if mode.is_legacy() {
                IrqFlags::SHARED
            } else {
                IrqFlags::empty()
            },
            handler,
        };
        let handle = exposer.register(info).map_err(|err| {
            warn!("{}: exposer registration failed: {:?}", device.name(), err);
            UioError::Platform(err)
        })?;
        journal.commit();

        info!(
            "{}: claimed as uio{} ({:?})",
            device.name(),
            handle.minor(),
            mode
        );
        Ok(Arc::new(Self {
            device,
            exposer,
            lookup,
            mode,
            handle,
            driver: config.driver,
            stats,
            lifecycle: BindingLifecycle::new(),
        }))
    }

    /// Binds the notifier named `id` to MSI-X vector `vector`.
    ///
    /// A negative `id` disables delivery instead: MSI-X is torn down in
    /// vector mode, INTx is masked in legacy mode.
    ///
    /// # Errors
    ///
    /// - [`UioError::BadState`] once teardown has begun.
    /// - [`UioError::OutOfRange`] for any non-negative `id` in legacy mode,
    ///   which has no vectors.
    /// - Otherwise as [`NotificationRegistry::bind_notification`](crate::NotificationRegistry::bind_notification).
    pub fn bind_notification(&self, vector: u32, id: i32) -> UioResult {
        let _access = self.lifecycle.try_begin_access().ok_or(UioError::BadState)?;
        match &self.mode {
            InterruptMode::VectorTable(registry) => {
                registry.bind_notification(vector, id, &*self.lookup)
            }
            InterruptMode::LegacyLine { irq } => {
                if id >= 0 {
                    return Err(UioError::OutOfRange);
                }
                self.device.set_intx(false);
                info!("{}: legacy line {} disabled", self.device.name(), irq);
                Ok(())
            }
        }
    }

    /// Binds `notifier` to MSI-X vector `index` directly.
    pub fn bind(&self, index: usize, notifier: Arc<dyn EventNotifier>) -> UioResult {
        let _access = self.lifecycle.try_begin_access().ok_or(UioError::BadState)?;
        match &self.mode {
            InterruptMode::VectorTable(registry) => registry.bind(index, notifier),
            InterruptMode::LegacyLine { .. } => Err(UioError::OutOfRange),
        }
    }

    /// Unmasks (`enable == true`) or masks INTx at the device.
    ///
    /// The consumer re-arms the line this way after servicing each legacy
    /// interrupt.
    ///
    /// # Errors
    ///
    /// [`UioError::BadState`] in vector mode or once teardown has begun.
    pub fn irqcontrol(&self, enable: bool) -> UioResult {
        let _access = self.lifecycle.try_begin_access().ok_or(UioError::BadState)?;
        if !self.mode.is_legacy() {
            return Err(UioError::BadState);
        }
        self.device.set_intx(enable);
        trace!("{}: INTx {}", self.device.name(), if enable { "unmasked" } else { "masked" });
        Ok(())
    }

    /// Tears the binding down because the consumer disconnected.
    pub fn release(&self) {
        self.shutdown();
    }

    /// Tears the binding down because the device is being removed.
    pub fn teardown(&self) {
        self.shutdown();
    }

    fn shutdown(&self) {
        if !self.lifecycle.begin_teardown() {
            while self.lifecycle.state() != BindingState::TornDown {
                core::hint::spin_loop();
            }
            return;
        }
        self.lifecycle.wait_idle();

        self.exposer.unregister(&self.handle);
        if let Some(registry) = self.mode.registry() {
            registry.unbind_all();
        }
        // Best effort only: DMA the device already queued may still land, and
        // the device may need a reset before it is usable again.
        self.device.clear_master();
        self.mode.deconfigure(&*self.device);
        self.device.disable_device();

        self.lifecycle.finish_teardown();
        info!("{}: uio{} torn down", self.device.name(), self.handle.minor());
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> BindingState {
        self.lifecycle.state()
    }

    /// The selected interrupt mode.
    #[inline]
    pub fn mode(&self) -> &InterruptMode {
        &self.mode
    }

    /// Number of MSI-X vectors. Zero in legacy mode.
    pub fn vector_count(&self) -> usize {
        self.mode.vector_count()
    }

    /// Minor number assigned by the exposer.
    #[inline]
    pub fn minor(&self) -> usize {
        self.handle.minor()
    }

    /// Legacy-line event counter the consumer polls.
    #[inline]
    pub fn event(&self) -> &Arc<UioEvent> {
        self.handle.event()
    }

    /// Interrupt statistics.
    #[inline]
    pub fn stats(&self) -> &IrqStats {
        &self.stats
    }

    /// Identification the binding was published with.
    #[inline]
    pub fn driver(&self) -> &UioDriverInfo {
        &self.driver
    }
}

impl Drop for UioBinding {
    fn drop(&mut self) {
        if self.lifecycle.state() == BindingState::Claimed {
            warn!("{}: dropped while claimed", self.device.name());
            self.shutdown();
        }
    }
}

impl core::fmt::Debug for UioBinding {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UioBinding")
            .field("device", &self.device.name())
            .field("minor", &self.handle.minor())
            .field("mode", &self.mode)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}
