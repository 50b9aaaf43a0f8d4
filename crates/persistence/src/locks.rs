use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use crate::slot::SlotId;

static SLOT_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_slot_lock_poison_once(operation: &'static str) {
    if SLOT_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "slot lock poisoned; recovered inner value");
    }
}

/// Per-slot busy flags shared between the coordinator and anything else that
/// touches slot files.
#[derive(Clone, Debug, Default)]
pub struct SlotLocks {
    busy: Arc<Mutex<HashSet<SlotId>>>,
}

impl SlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` when `slot` is already held. Requests are never queued.
    pub fn try_acquire(&self, slot: SlotId) -> Option<SlotGuard> {
        let inserted = self.lock("acquire").insert(slot);
        inserted.then(|| SlotGuard {
            locks: self.clone(),
            slot,
        })
    }

    pub fn is_busy(&self, slot: SlotId) -> bool {
        self.lock("query").contains(&slot)
    }

    fn release(&self, slot: SlotId) {
        self.lock("release").remove(&slot);
    }

    fn lock(&self, operation: &'static str) -> MutexGuard<'_, HashSet<SlotId>> {
        match self.busy.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_slot_lock_poison_once(operation);
                poisoned.into_inner()
            }
        }
    }
}

/// Holds a slot busy until dropped.
#[derive(Debug)]
pub struct SlotGuard {
    locks: SlotLocks,
    slot: SlotId,
}

impl SlotGuard {
    pub fn slot(&self) -> SlotId {
        self.slot
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.locks.release(self.slot);
    }
}
