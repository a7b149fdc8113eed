//! Blocking-submit rendezvous: a condition variable standing in for a
//! polling-with-sleep wait loop.

use crate::error::Disposition;
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

pub(crate) struct Rendezvous<O> {
    slot: Mutex<Option<Disposition<O>>>,
    ready: Condvar,
}

impl<O> Rendezvous<O> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Called once, from the worker thread, to deliver the final result.
    pub fn resolve(&self, disposition: Disposition<O>) {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            // Invariant: resolved exactly once. A second resolution
            // attempt is a bug in the caller and is dropped rather than
            // panicking the worker thread.
            return;
        }
        *slot = Some(disposition);
        self.ready.notify_all();
    }

    /// Waits up to `timeout` for a resolution. Returns `None` on
    /// timeout; the eventual (discarded) result, if one ever arrives,
    /// is simply never read by the caller.
    pub fn wait(&self, timeout: Duration) -> Option<Disposition<O>> {
        let mut slot = self.slot.lock();
        let deadline = Instant::now() + timeout;
        while slot.is_none() {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let remaining = deadline - now;
            let result = self.ready.wait_for(&mut slot, remaining);
            if result.timed_out() && slot.is_none() {
                return None;
            }
        }
        slot.take()
    }
}
