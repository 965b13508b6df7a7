//! Resolution of consumer-supplied notifier identifiers.
//!
//! The consumer names a notifier by an integer, the way a process names an
//! eventfd by its file descriptor. [`NotifierTable`] is a simple id map that
//! plays the role of the descriptor table.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicI32, Ordering};

use axerrno::{ax_err, AxResult};
use spin::RwLock;

use super::eventfd::EventNotifier;

/// Resolves an external identifier to a notifier reference.
pub trait NotifierLookup: Send + Sync {
    /// Takes a new reference to the notifier named `id`, or `None` if `id`
    /// does not name one.
    fn lookup(&self, id: i32) -> Option<Arc<dyn EventNotifier>>;
}

/// Id-indexed notifier table.
pub struct NotifierTable {
    /// Installed notifiers indexed by id.
    entries: RwLock<BTreeMap<i32, Arc<dyn EventNotifier>>>,
    /// Next id to hand out.
    next_id: AtomicI32,
}

impl NotifierTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            next_id: AtomicI32::new(0),
        }
    }

    /// Installs `notifier` and returns the id that names it.
    pub fn install(&self, notifier: Arc<dyn EventNotifier>) -> i32 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.write().insert(id, notifier);
        id
    }

    /// Drops the table's reference to the notifier named `id`.
    ///
    /// References already handed out by [`NotifierLookup::lookup`] stay valid.
    pub fn remove(&self, id: i32) -> AxResult {
        if self.entries.write().remove(&id).is_none() {
            return ax_err!(NotFound, "notifier id not installed");
        }
        Ok(())
    }

    /// Checks if `id` names an installed notifier.
    pub fn contains(&self, id: i32) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Gets the number of installed notifiers.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Checks if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for NotifierTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifierLookup for NotifierTable {
    fn lookup(&self, id: i32) -> Option<Arc<dyn EventNotifier>> {
        self.entries.read().get(&id).cloned()
    }
}
