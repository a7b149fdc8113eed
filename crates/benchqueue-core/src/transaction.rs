//! Transaction manager: an ordered, atomic group of
//! commands committed together, with an aggregated completion callback.

use crate::adapter::DeviceAdapter;
use crate::command::{Priority, TransactionId, TransactionIdAllocator};
use crate::error::{Disposition, EngineError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionFlags {
    pub abort_on_error: bool,
}

/// The aggregated outcome delivered exactly once to a transaction's
/// commit callback.
pub struct TransactionResult<O> {
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<Disposition<O>>,
}

struct PendingTransaction<A: DeviceAdapter> {
    entries: Vec<(A::Kind, A::Params)>,
    flags: TransactionFlags,
    priority: Priority,
    #[allow(dead_code)] // surfaced through accessors as the façade grows
    timeout: Option<Duration>,
}

struct CommittedTransaction<O> {
    total: usize,
    abort_on_error: bool,
    aborted: AtomicBool,
    remaining: AtomicUsize,
    results: Mutex<Vec<Option<Disposition<O>>>>,
    callback: Mutex<Option<Box<dyn FnOnce(TransactionResult<O>) + Send>>>,
}

enum Slot<A: DeviceAdapter> {
    Pending(PendingTransaction<A>),
    Committed(Arc<CommittedTransaction<A::Outcome>>),
    /// A committed-then-cancelled-before-start transaction: members were
    /// pulled back out of the pipeline before any dispatched, so there
    /// is nothing left to aggregate.
    Disposed,
}

pub(crate) struct TransactionRegistry<A: DeviceAdapter> {
    ids: TransactionIdAllocator,
    slots: Mutex<HashMap<TransactionId, Slot<A>>>,
    max_len: usize,
}

impl<A: DeviceAdapter> TransactionRegistry<A> {
    pub fn new(max_len: usize) -> Self {
        Self {
            ids: TransactionIdAllocator::new(),
            slots: Mutex::new(HashMap::new()),
            max_len,
        }
    }

    pub fn begin(&self) -> TransactionId {
        let id = self.ids.next();
        self.slots.lock().insert(
            id,
            Slot::Pending(PendingTransaction {
                entries: Vec::new(),
                flags: TransactionFlags::default(),
                priority: Priority::Normal,
                timeout: None,
            }),
        );
        id
    }

    fn with_pending<R>(
        &self,
        id: TransactionId,
        f: impl FnOnce(&mut PendingTransaction<A>) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let mut slots = self.slots.lock();
        match slots.get_mut(&id) {
            None => Err(EngineError::NotFound),
            Some(Slot::Pending(p)) => f(p),
            Some(Slot::Committed(_)) | Some(Slot::Disposed) => Err(EngineError::InvalidState),
        }
    }

    pub fn set_priority(&self, id: TransactionId, priority: Priority) -> Result<(), EngineError> {
        self.with_pending(id, |p| {
            p.priority = priority;
            Ok(())
        })
    }

    pub fn set_flags(&self, id: TransactionId, flags: TransactionFlags) -> Result<(), EngineError> {
        self.with_pending(id, |p| {
            p.flags = flags;
            Ok(())
        })
    }

    pub fn set_timeout(&self, id: TransactionId, timeout: Duration) -> Result<(), EngineError> {
        self.with_pending(id, |p| {
            p.timeout = Some(timeout);
            Ok(())
        })
    }

    pub fn add(&self, id: TransactionId, kind: A::Kind, params: A::Params) -> Result<(), EngineError> {
        self.with_pending(id, |p| {
            if p.entries.len() >= self.max_len {
                return Err(EngineError::InvalidParameter(format!(
                    "transaction already has the maximum of {} commands",
                    self.max_len
                )));
            }
            p.entries.push((kind, params));
            Ok(())
        })
    }

    /// Commits a transaction, returning the priority to enqueue at and
    /// the ordered `(kind, params)` list the caller (the façade) turns
    /// into real `CommandRecord`s before pushing them onto the pipeline
    /// as one contiguous batch.
    pub fn commit(
        &self,
        id: TransactionId,
        callback: Box<dyn FnOnce(TransactionResult<A::Outcome>) + Send>,
    ) -> Result<(Priority, Vec<(A::Kind, A::Params)>), EngineError> {
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(&id).ok_or(EngineError::NotFound)?;
        let pending = match slot {
            Slot::Pending(p) => p,
            Slot::Committed(_) | Slot::Disposed => return Err(EngineError::InvalidState),
        };
        if pending.entries.is_empty() {
            return Err(EngineError::InvalidState);
        }
        let total = pending.entries.len();
        let entries = std::mem::take(&mut pending.entries);
        let priority = pending.priority;
        let abort_on_error = pending.flags.abort_on_error;
        *slot = Slot::Committed(Arc::new(CommittedTransaction {
            total,
            abort_on_error,
            aborted: AtomicBool::new(false),
            remaining: AtomicUsize::new(total),
            results: Mutex::new(vec![None; total]),
            callback: Mutex::new(Some(callback)),
        }));
        Ok((priority, entries))
    }

    /// Uncommitted: disposes the transaction. Committed-not-yet-started
    /// or partially executed: marks it aborted so the worker's hold loop
    /// stops dispatching further members; the caller (cancellation
    /// engine) is responsible for pulling any still-queued members back
    /// out of the pipeline and resolving them as `Cancelled`.
    pub fn cancel(&self, id: TransactionId) -> Result<(), EngineError> {
        let mut slots = self.slots.lock();
        match slots.get_mut(&id) {
            None => Err(EngineError::NotFound),
            Some(slot @ Slot::Pending(_)) => {
                *slot = Slot::Disposed;
                Ok(())
            }
            Some(Slot::Committed(committed)) => {
                committed.aborted.store(true, Ordering::Release);
                Ok(())
            }
            Some(Slot::Disposed) => Err(EngineError::InvalidState),
        }
    }

    pub fn is_aborted(&self, id: TransactionId) -> bool {
        match self.slots.lock().get(&id) {
            Some(Slot::Committed(c)) => c.aborted.load(Ordering::Acquire),
            _ => false,
        }
    }

    pub fn total(&self, id: TransactionId) -> Option<usize> {
        match self.slots.lock().get(&id) {
            Some(Slot::Committed(c)) => Some(c.total),
            _ => None,
        }
    }

    fn committed_handle(&self, id: TransactionId) -> Option<Arc<CommittedTransaction<A::Outcome>>> {
        match self.slots.lock().get(&id) {
            Some(Slot::Committed(c)) => Some(Arc::clone(c)),
            _ => None,
        }
    }

    /// Records one member's disposition. If abort-on-error is set and
    /// this disposition is a failure, marks the transaction aborted so
    /// the worker cancels the rest in place. Returns the aggregated
    /// result once every member has resolved (fires the callback
    /// exactly once, then forgets the slot).
    pub fn notify_member_resolved(
        &self,
        id: TransactionId,
        index: usize,
        disposition: Disposition<A::Outcome>,
    ) {
        let Some(committed) = self.committed_handle(id) else {
            return;
        };
        if committed.abort_on_error && matches!(disposition, Disposition::Failed(_)) {
            committed.aborted.store(true, Ordering::Release);
        }
        {
            let mut results = committed.results.lock();
            results[index] = Some(disposition);
        }
        if committed.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let results: Vec<Disposition<A::Outcome>> = committed
                .results
                .lock()
                .drain(..)
                .map(|r| r.expect("every slot is written before remaining reaches zero"))
                .collect();
            let success_count = results.iter().filter(|r| r.is_terminal_success()).count();
            let failure_count = results.len() - success_count;
            debug_assert_eq!(results.len(), committed.total);
            if let Some(callback) = committed.callback.lock().take() {
                callback(TransactionResult {
                    success_count,
                    failure_count,
                    results,
                });
            }
            self.slots.lock().remove(&id);
        }
    }
}
