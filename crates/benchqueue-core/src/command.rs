//! Command record and its completion slot.

use crate::adapter::DeviceAdapter;
use crate::error::Disposition;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonically assigned, unique for the lifetime of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(pub u64);

/// Coarse, three-level priority. `High > Normal > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Low = 0,
    Normal = 1,
    High = 2,
}

pub(crate) struct IdAllocator(AtomicU64);

impl IdAllocator {
    pub(crate) fn new() -> Self {
        // 0 is reserved as the "rejected submission" / "no transaction" sentinel.
        Self(AtomicU64::new(1))
    }

    pub(crate) fn next_command(&self) -> CommandId {
        CommandId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) struct TransactionIdAllocator(AtomicU64);

impl TransactionIdAllocator {
    pub(crate) fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub(crate) fn next(&self) -> TransactionId {
        TransactionId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// How a caller wants to learn the outcome of a command.
pub(crate) enum Completion<O> {
    /// `submit_blocking`: resolved by writing into a shared slot guarded
    /// by the pipeline's condvar.
    Blocking(Arc<crate::rendezvous::Rendezvous<O>>),
    /// `submit_async`: fired exactly once, on the worker thread.
    Callback(Box<dyn FnOnce(Disposition<O>) + Send>),
    /// Member of a transaction: the transaction aggregator is notified
    /// instead of the caller directly. The `usize` is this command's
    /// position within the transaction, for result aggregation.
    Transaction(TransactionId, usize),
}

/// One unit of work in flight. Generic over the adapter so that its
/// `Kind`/`Params`/`Outcome` types are exactly the adapter's own.
pub(crate) struct CommandRecord<A: DeviceAdapter> {
    pub id: CommandId,
    pub kind: A::Kind,
    pub priority: Priority,
    pub submitted_at: Instant,
    pub params: A::Params,
    pub completion: Completion<A::Outcome>,
    pub transaction_id: Option<TransactionId>,
    pub cancelled: Arc<AtomicBool>,
}

impl<A: DeviceAdapter> CommandRecord<A> {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A lightweight, cloneable token returned to callers who want to cancel
/// a specific command later without holding the record itself.
#[derive(Clone)]
pub struct CancelToken {
    pub(crate) id: CommandId,
    pub(crate) flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Marks the command cancelled. Advisory: if the worker has already
    /// dispatched it, the device operation still runs to completion but
    /// the result will be tagged as observed-after-cancel.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
