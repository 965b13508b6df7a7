//! Binding lifecycle with an atomic state machine and access tracking.
//!
//! A binding moves `Claimed → Releasing → TornDown` exactly once. Consumer
//! release and forced teardown may race; the compare-and-swap in
//! [`BindingLifecycle::begin_teardown`] picks the single caller that performs
//! the teardown work.
//!
//! Control-path calls (bind, re-arm) hold an [`AccessGuard`] while they run so
//! that teardown can wait for them to drain instead of pulling the vector
//! table out from under them.
//!
//! Layout: `[state(8 bits) | access_count(24 bits)]`

use core::sync::atomic::{AtomicU32, Ordering};

/// Binding lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BindingState {
    /// The device is claimed and accepts control-path requests.
    Claimed = 0,
    /// Teardown has started; new requests are rejected.
    Releasing = 1,
    /// All resources have been returned. Terminal.
    TornDown = 2,
}

/// State and in-flight access count packed into one atomic word.
struct StateAndCount(AtomicU32);

impl StateAndCount {
    const STATE_SHIFT: u32 = 24;
    const COUNT_MASK: u32 = (1 << Self::STATE_SHIFT) - 1;
    const CLAIMED: u32 = BindingState::Claimed as u32;
    const RELEASING: u32 = BindingState::Releasing as u32;
    const TORN_DOWN: u32 = BindingState::TornDown as u32;

    const fn new() -> Self {
        Self(AtomicU32::new(Self::CLAIMED << Self::STATE_SHIFT))
    }

    #[inline]
    fn state(&self) -> BindingState {
        match self.0.load(Ordering::Acquire) >> Self::STATE_SHIFT {
            Self::CLAIMED => BindingState::Claimed,
            Self::RELEASING => BindingState::Releasing,
            _ => BindingState::TornDown,
        }
    }

    #[inline]
    fn count(&self) -> u32 {
        self.0.load(Ordering::Acquire) & Self::COUNT_MASK
    }

    /// Increments the access count if the binding is still claimed.
    fn try_acquire(&self) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let count = current & Self::COUNT_MASK;
                if current >> Self::STATE_SHIFT != Self::CLAIMED || count == Self::COUNT_MASK {
                    None
                } else {
                    Some(current + 1)
                }
            })
            .is_ok()
    }

    #[inline]
    fn release(&self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }

    /// Moves `Claimed → Releasing`, keeping the count. Only one caller wins.
    fn try_set_releasing(&self) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if current >> Self::STATE_SHIFT != Self::CLAIMED {
                    None
                } else {
                    Some((Self::RELEASING << Self::STATE_SHIFT) | (current & Self::COUNT_MASK))
                }
            })
            .is_ok()
    }

    fn set_torn_down(&self) {
        self.0
            .store(Self::TORN_DOWN << Self::STATE_SHIFT, Ordering::Release);
    }
}

/// Tracks a binding's lifecycle state and in-flight control-path accesses.
///
/// # State Transitions
///
/// ```text
/// ┌─────────┐ begin_teardown() ┌───────────┐ wait_idle() + finish_teardown() ┌──────────┐
/// │ Claimed │ ───────────────> │ Releasing │ ──────────────────────────────> │ TornDown │
/// └─────────┘                  └───────────┘                                 └──────────┘
/// ```
pub struct BindingLifecycle {
    state_count: StateAndCount,
}

impl BindingLifecycle {
    /// Creates a lifecycle in the `Claimed` state.
    pub const fn new() -> Self {
        Self {
            state_count: StateAndCount::new(),
        }
    }

    /// Gets the current state.
    #[inline]
    pub fn state(&self) -> BindingState {
        self.state_count.state()
    }

    /// Gets the number of control-path calls in flight.
    #[inline]
    pub fn active_accesses(&self) -> usize {
        self.state_count.count() as usize
    }

    /// Registers a control-path access. `None` once teardown has begun.
    #[inline]
    pub fn try_begin_access(&self) -> Option<AccessGuard<'_>> {
        if self.state_count.try_acquire() {
            Some(AccessGuard { lifecycle: self })
        } else {
            None
        }
    }

    /// Starts teardown. Returns `true` for exactly one caller.
    pub fn begin_teardown(&self) -> bool {
        self.state_count.try_set_releasing()
    }

    /// Spins until every access registered before teardown has ended.
    pub fn wait_idle(&self) {
        while self.state_count.count() != 0 {
            for _ in 0..100 {
                core::hint::spin_loop();
            }
        }
    }

    /// Marks teardown complete. Call after [`BindingLifecycle::wait_idle`].
    pub fn finish_teardown(&self) {
        self.state_count.set_torn_down();
    }
}

impl Default for BindingLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for BindingLifecycle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BindingLifecycle")
            .field("state", &self.state())
            .field("active_accesses", &self.active_accesses())
            .finish()
    }
}

/// An in-flight control-path access; ends when dropped.
pub struct AccessGuard<'a> {
    lifecycle: &'a BindingLifecycle,
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        self.lifecycle.state_count.release();
    }
}
