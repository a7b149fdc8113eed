//! Priority pipeline: three bounded FIFOs, strict
//! priority dequeue, re-checked after each dispatch.

use crate::adapter::DeviceAdapter;
use crate::command::{CommandId, CommandRecord, Priority};
use crate::error::EngineError;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub struct PipelineCapacities {
    pub high: usize,
    pub normal: usize,
    pub low: usize,
}

impl Default for PipelineCapacities {
    fn default() -> Self {
        Self {
            high: 64,
            normal: 256,
            low: 256,
        }
    }
}

struct Inner<A: DeviceAdapter> {
    high: VecDeque<CommandRecord<A>>,
    normal: VecDeque<CommandRecord<A>>,
    low: VecDeque<CommandRecord<A>>,
    shutdown: bool,
}

impl<A: DeviceAdapter> Inner<A> {
    fn queue_mut(&mut self, priority: Priority) -> &mut VecDeque<CommandRecord<A>> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Normal => &mut self.normal,
            Priority::Low => &mut self.low,
        }
    }

    fn queue(&self, priority: Priority) -> &VecDeque<CommandRecord<A>> {
        match priority {
            Priority::High => &self.high,
            Priority::Normal => &self.normal,
            Priority::Low => &self.low,
        }
    }
}

/// A single lock guards all three queues. Contention is acceptable: the
/// critical sections are O(1) pushes/pops, and this is what lets
/// cancellation scan/remove arbitrary queued commands without a second
/// lock acquisition order to reason about.
pub(crate) struct PriorityPipeline<A: DeviceAdapter> {
    inner: Mutex<Inner<A>>,
    not_empty: Condvar,
    caps: PipelineCapacities,
}

impl<A: DeviceAdapter> PriorityPipeline<A> {
    pub fn new(caps: PipelineCapacities) -> Self {
        Self {
            inner: Mutex::new(Inner {
                high: VecDeque::new(),
                normal: VecDeque::new(),
                low: VecDeque::new(),
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            caps,
        }
    }

    fn capacity(&self, priority: Priority) -> usize {
        match priority {
            Priority::High => self.caps.high,
            Priority::Normal => self.caps.normal,
            Priority::Low => self.caps.low,
        }
    }

    /// Enqueues one record, waiting up to `timeout` for room. A zero
    /// timeout tries exactly once.
    pub fn push(
        &self,
        priority: Priority,
        record: CommandRecord<A>,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if inner.shutdown {
                return Err(EngineError::InvalidState);
            }
            let cap = self.capacity(priority);
            if inner.queue(priority).len() < cap {
                inner.queue_mut(priority).push_back(record);
                self.not_empty.notify_all();
                return Ok(());
            }
            if timeout.is_zero() {
                return Err(EngineError::QueueFull);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(EngineError::QueueFull);
            }
            self.not_empty.wait_for(&mut inner, deadline - now);
        }
    }

    /// Enqueues a whole committed transaction contiguously at one
    /// priority. Holding one lock for the whole batch is what prevents
    /// any other command from interleaving into that priority's queue
    /// between the transaction's members.
    pub fn push_transaction_batch(
        &self,
        priority: Priority,
        mut records: Vec<CommandRecord<A>>,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        if inner.shutdown {
            return Err(EngineError::InvalidState);
        }
        let queue = inner.queue_mut(priority);
        queue.extend(records.drain(..));
        self.not_empty.notify_all();
        Ok(())
    }

    /// Strict-priority dequeue: drain High, then at most one Normal,
    /// then at most one Low, re-checked on every call. Blocks up to
    /// `wait` for new work; returns `None` on timeout so the worker can
    /// re-observe shutdown.
    pub fn dequeue_one(&self, wait: Duration) -> Option<CommandRecord<A>> {
        let mut inner = self.inner.lock();
        let deadline = Instant::now() + wait;
        loop {
            if let Some(r) = inner.high.pop_front() {
                return Some(r);
            }
            if let Some(r) = inner.normal.pop_front() {
                return Some(r);
            }
            if let Some(r) = inner.low.pop_front() {
                return Some(r);
            }
            if inner.shutdown {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            self.not_empty.wait_for(&mut inner, deadline - now);
        }
    }

    /// Pops the next record from a specific priority's queue without
    /// consulting the other two. Used only by the worker while holding a
    /// committed transaction, where the remaining members are known to
    /// be contiguous at the front of this exact queue.
    pub fn pop_held(&self, priority: Priority) -> Option<CommandRecord<A>> {
        let mut inner = self.inner.lock();
        inner.queue_mut(priority).pop_front()
    }

    pub fn depths(&self) -> (usize, usize, usize) {
        let inner = self.inner.lock();
        (inner.high.len(), inner.normal.len(), inner.low.len())
    }

    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.shutdown = true;
        self.not_empty.notify_all();
    }

    /// Drains every channel, invoking `f` on each removed record, used
    /// by cancel-all and by `destroy`.
    pub fn drain_all(&self, mut f: impl FnMut(CommandRecord<A>)) {
        let mut inner = self.inner.lock();
        for q in [&mut inner.high, &mut inner.normal, &mut inner.low] {
            while let Some(r) = q.pop_front() {
                f(r);
            }
        }
    }

    /// Removes a single queued command by id, if still queued, calling
    /// `f` on it before dropping the lock.
    pub fn remove_by_id(&self, id: CommandId, mut f: impl FnMut(CommandRecord<A>)) -> bool {
        let mut inner = self.inner.lock();
        for q in [&mut inner.high, &mut inner.normal, &mut inner.low] {
            if let Some(pos) = q.iter().position(|r| r.id == id) {
                let record = q.remove(pos).expect("position just found");
                f(record);
                return true;
            }
        }
        false
    }

    /// Removes every queued command whose kind matches `matches`,
    /// calling `f` on each.
    pub fn remove_by(&self, mut matches: impl FnMut(&CommandRecord<A>) -> bool, mut f: impl FnMut(CommandRecord<A>)) {
        let mut inner = self.inner.lock();
        for q in [&mut inner.high, &mut inner.normal, &mut inner.low] {
            let mut i = 0;
            while i < q.len() {
                if matches(&q[i]) {
                    let record = q.remove(i).expect("index in bounds");
                    f(record);
                } else {
                    i += 1;
                }
            }
        }
    }
}
