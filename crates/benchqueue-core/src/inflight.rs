//! Tracks the single command currently dispatched to the adapter, so
//! `cancel_by_id` can still flag it (advisory only — it has already
//! left the pipeline and is running on the device).

use crate::command::CommandId;
use parking_lot::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) struct InFlight {
    slot: Mutex<Option<(CommandId, Arc<AtomicBool>)>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn set(&self, id: CommandId, flag: Arc<AtomicBool>) {
        *self.slot.lock() = Some((id, flag));
    }

    pub fn clear(&self, id: CommandId) {
        let mut slot = self.slot.lock();
        if matches!(&*slot, Some((current, _)) if *current == id) {
            *slot = None;
        }
    }

    /// Returns `true` if `id` was the in-flight command and its flag was
    /// set.
    pub fn try_flag(&self, id: CommandId) -> bool {
        let slot = self.slot.lock();
        match &*slot {
            Some((current, flag)) if *current == id => {
                flag.store(true, std::sync::atomic::Ordering::Release);
                true
            }
            _ => false,
        }
    }
}
