//! Simulated collaborators for unit tests.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axerrno::{ax_err, AxResult};
use spin::{Mutex, RwLock};

use crate::hal::{IrqCookie, IrqFlags, IrqHandler, IrqPlatform, IrqReturn, MsixEntry, PciDevice};

/// Base of the platform vectors handed out by [`MockPciDevice::enable_msix`].
pub const MOCK_VECTOR_BASE: u32 = 100;

#[derive(Debug, Default)]
struct MockState {
    enabled: bool,
    master: bool,
    intx_pending: bool,
    intx_masked: bool,
    msix_enabled: bool,
}

/// A PCI function with configurable interrupt capabilities.
pub struct MockPciDevice {
    irq: Option<u32>,
    intx_mask_supported: bool,
    msix_count: usize,
    msix_grant: Option<usize>,
    fail_enable: bool,
    state: Mutex<MockState>,
}

impl MockPciDevice {
    pub fn legacy(irq: u32) -> Self {
        Self {
            irq: Some(irq),
            intx_mask_supported: true,
            msix_count: 0,
            msix_grant: None,
            fail_enable: false,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn msix(count: usize) -> Self {
        Self {
            irq: None,
            intx_mask_supported: true,
            msix_count: count,
            msix_grant: Some(count),
            fail_enable: false,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn without_intx_mask(mut self) -> Self {
        self.intx_mask_supported = false;
        self
    }

    pub fn granting(mut self, granted: usize) -> Self {
        self.msix_grant = Some(granted);
        self
    }

    pub fn rejecting_msix(mut self) -> Self {
        self.msix_grant = None;
        self
    }

    pub fn failing_enable(mut self) -> Self {
        self.fail_enable = true;
        self
    }

    /// Latches an INTx assertion unless INTx is masked.
    pub fn raise_intx(&self) {
        let mut state = self.state.lock();
        if !state.intx_masked {
            state.intx_pending = true;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn is_master(&self) -> bool {
        self.state.lock().master
    }

    pub fn intx_masked(&self) -> bool {
        self.state.lock().intx_masked
    }

    pub fn msix_enabled(&self) -> bool {
        self.state.lock().msix_enabled
    }
}

impl PciDevice for MockPciDevice {
    fn name(&self) -> &str {
        "0000:00:04.0"
    }

    fn enable_device(&self) -> AxResult {
        if self.fail_enable {
            return ax_err!(Io, "enable failed");
        }
        let mut state = self.state.lock();
        state.enabled = true;
        state.master = true;
        Ok(())
    }

    fn disable_device(&self) {
        self.state.lock().enabled = false;
    }

    fn irq(&self) -> Option<u32> {
        self.irq
    }

    fn intx_mask_supported(&self) -> bool {
        self.intx_mask_supported
    }

    fn check_and_mask_intx(&self) -> bool {
        let mut state = self.state.lock();
        if state.intx_pending && !state.intx_masked {
            state.intx_masked = true;
            state.intx_pending = false;
            true
        } else {
            false
        }
    }

    fn set_intx(&self, enable: bool) {
        self.state.lock().intx_masked = !enable;
    }

    fn msix_vec_count(&self) -> usize {
        self.msix_count
    }

    fn enable_msix(&self, entries: &mut [MsixEntry]) -> AxResult<usize> {
        let Some(grant) = self.msix_grant else {
            return ax_err!(Unsupported, "MSI-X rejected");
        };
        let granted = grant.min(entries.len());
        for entry in entries.iter_mut().take(granted) {
            entry.vector = MOCK_VECTOR_BASE + entry.entry as u32;
        }
        self.state.lock().msix_enabled = granted > 0;
        Ok(granted)
    }

    fn disable_msix(&self) {
        self.state.lock().msix_enabled = false;
    }

    fn clear_master(&self) {
        self.state.lock().master = false;
    }
}

/// An interrupt controller whose `free_irq` excludes running handlers by
/// holding the handler table's write lock.
#[derive(Default)]
pub struct MockIrqPlatform {
    handlers: RwLock<BTreeMap<u32, Vec<(IrqCookie, Arc<dyn IrqHandler>)>>>,
    next_cookie: AtomicUsize,
    fail_request: AtomicBool,
}

impl MockIrqPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_request(&self, fail: bool) {
        self.fail_request.store(fail, Ordering::SeqCst);
    }

    /// Delivers `irq` to every handler on it. `None` if nothing is installed.
    pub fn fire(&self, irq: u32) -> Option<IrqReturn> {
        let handlers = self.handlers.read();
        let actions = handlers.get(&irq)?;
        let mut ret = IrqReturn::NotMine;
        for (_, handler) in actions {
            if handler.handle(irq) == IrqReturn::Handled {
                ret = IrqReturn::Handled;
            }
        }
        Some(ret)
    }

    pub fn handler_count(&self, irq: u32) -> usize {
        self.handlers.read().get(&irq).map_or(0, Vec::len)
    }

    pub fn total_handlers(&self) -> usize {
        self.handlers.read().values().map(Vec::len).sum()
    }
}

impl IrqPlatform for MockIrqPlatform {
    fn request_irq(
        &self,
        irq: u32,
        _flags: IrqFlags,
        _name: &'static str,
        handler: Arc<dyn IrqHandler>,
    ) -> AxResult<IrqCookie> {
        if self.fail_request.load(Ordering::SeqCst) {
            return ax_err!(ResourceBusy, "irq unavailable");
        }
        let cookie = IrqCookie(self.next_cookie.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .entry(irq)
            .or_default()
            .push((cookie, handler));
        Ok(cookie)
    }

    fn free_irq(&self, irq: u32, cookie: IrqCookie) {
        let mut handlers = self.handlers.write();
        if let Some(actions) = handlers.get_mut(&irq) {
            actions.retain(|(c, _)| *c != cookie);
            if actions.is_empty() {
                handlers.remove(&irq);
            }
        }
    }
}

/// A notifier that counts signals.
#[derive(Default)]
pub struct CountingNotifier {
    signals: AtomicUsize,
}

impl CountingNotifier {
    pub fn signals(&self) -> usize {
        self.signals.load(Ordering::SeqCst)
    }
}

impl crate::notify::EventNotifier for CountingNotifier {
    fn signal(&self, _count: u64) {
        self.signals.fetch_add(1, Ordering::SeqCst);
    }
}
