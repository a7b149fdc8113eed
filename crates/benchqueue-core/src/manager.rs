//! Public façade: the only type client code touches.

use crate::adapter::DeviceAdapter;
use crate::cancellation;
use crate::command::{CancelToken, CommandId, CommandRecord, Completion, IdAllocator, Priority, TransactionId};
use crate::config::ManagerConfig;
use crate::error::{BlockingOutcome, Disposition, EngineError};
use crate::inflight::InFlight;
use crate::pipeline::PriorityPipeline;
use crate::rendezvous::Rendezvous;
use crate::stats::{Stats, StatsInner};
use crate::supervisor::ConnectionSupervisor;
use crate::transaction::{TransactionFlags, TransactionRegistry, TransactionResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

pub(crate) struct ManagerInner<A: DeviceAdapter> {
    pub pipeline: PriorityPipeline<A>,
    pub transactions: TransactionRegistry<A>,
    pub ids: IdAllocator,
    pub stats: StatsInner,
    pub supervisor: ConnectionSupervisor,
    pub in_flight: InFlight,
    pub shutdown: AtomicBool,
    pub config: ManagerConfig,
}

/// A handle to a running queue manager. Dropping it without calling
/// [`QueueManager::destroy`] leaks the worker thread (it will keep
/// running detached); always call `destroy` on the way out.
pub struct QueueManager<A: DeviceAdapter> {
    inner: Arc<ManagerInner<A>>,
    worker: Option<JoinHandle<()>>,
}

impl<A: DeviceAdapter> QueueManager<A> {
    /// Initialises queues and statistics, starts the worker thread, and
    /// returns once the thread has been spawned (not once it has
    /// connected — connection happens asynchronously on the worker).
    pub fn create(adapter: A, config: ManagerConfig) -> Self {
        let inner = Arc::new(ManagerInner {
            pipeline: PriorityPipeline::new(config.capacities()),
            transactions: TransactionRegistry::new(config.max_transaction_commands),
            ids: IdAllocator::new(),
            stats: StatsInner::default(),
            supervisor: ConnectionSupervisor::new(
                config.reconnect_base_ms,
                config.reconnect_max_ms,
                config.max_reconnect_backoff_shift,
            ),
            in_flight: InFlight::new(),
            shutdown: AtomicBool::new(false),
            config,
        });

        let worker_inner = Arc::clone(&inner);
        let worker = std::thread::Builder::new()
            .name("benchqueue-worker".into())
            .spawn(move || crate::worker::run(worker_inner, adapter))
            .expect("failed to spawn benchqueue worker thread");

        Self {
            inner,
            worker: Some(worker),
        }
    }

    /// Sets shutdown, cancels everything outstanding, joins the worker
    /// (which calls `adapter.disconnect`), and consumes `self`.
    pub fn destroy(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.pipeline.shutdown();
        cancellation::cancel_all(&self.inner.pipeline, &self.inner.transactions);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }

    fn default_timeout(&self, timeout_ms: Option<u64>) -> Duration {
        match timeout_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self.inner.config.default_timeout(),
        }
    }

    /// Blocks until the command resolves or `timeout_ms` elapses
    /// (`None` uses `default_command_timeout_ms`).
    pub fn submit_blocking(
        &self,
        kind: A::Kind,
        params: A::Params,
        priority: Priority,
        timeout_ms: Option<u64>,
    ) -> BlockingOutcome<A::Outcome> {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return BlockingOutcome::InvalidState;
        }
        let timeout = self.default_timeout(timeout_ms);
        let deadline = std::time::Instant::now() + timeout;
        let rendezvous = Arc::new(Rendezvous::new());
        let record = CommandRecord {
            id: self.inner.ids.next_command(),
            kind,
            priority,
            submitted_at: std::time::Instant::now(),
            params,
            completion: Completion::Blocking(Arc::clone(&rendezvous)),
            transaction_id: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        if let Err(err) = self.inner.pipeline.push(priority, record, timeout) {
            return match err {
                EngineError::InvalidState => BlockingOutcome::InvalidState,
                _ => BlockingOutcome::QueueFull,
            };
        }
        let remaining = deadline.saturating_duration_since(std::time::Instant::now());
        match rendezvous.wait(remaining) {
            None => BlockingOutcome::Timeout,
            Some(Disposition::Completed(value)) => BlockingOutcome::Success(value),
            Some(Disposition::Failed(reason)) => BlockingOutcome::Failed(reason),
            Some(Disposition::Cancelled) => BlockingOutcome::Cancelled,
        }
    }

    /// Enqueues a command and returns immediately with a token that can
    /// later cancel it; `callback` fires exactly once, on the worker
    /// thread, after the command's cooldown. Returns `None` if the
    /// manager rejected the submission outright (full queue or
    /// shutting down).
    pub fn submit_async(
        &self,
        kind: A::Kind,
        params: A::Params,
        priority: Priority,
        callback: impl FnOnce(Disposition<A::Outcome>) + Send + 'static,
    ) -> Option<CancelToken> {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return None;
        }
        let cancelled = Arc::new(AtomicBool::new(false));
        let id = self.inner.ids.next_command();
        let record = CommandRecord {
            id,
            kind,
            priority,
            submitted_at: std::time::Instant::now(),
            params,
            completion: Completion::Callback(Box::new(callback)),
            transaction_id: None,
            cancelled: Arc::clone(&cancelled),
        };
        self.inner
            .pipeline
            .push(priority, record, Duration::ZERO)
            .ok()
            .map(|()| CancelToken {
                id,
                flag: cancelled,
            })
    }

    pub fn get_stats(&self) -> Stats {
        let (high_queued, normal_queued, low_queued) = self.inner.pipeline.depths();
        Stats {
            total_processed: self.inner.stats.total_processed.load(Ordering::Relaxed),
            total_errors: self.inner.stats.total_errors.load(Ordering::Relaxed),
            reconnect_attempts: self.inner.stats.reconnect_attempts.load(Ordering::Relaxed),
            high_queued,
            normal_queued,
            low_queued,
            is_connected: self.inner.supervisor.is_connected(),
            is_processing: !self.inner.shutdown.load(Ordering::Acquire),
            connection_state: self.inner.supervisor.state(),
        }
    }

    pub fn cancel_by_id(&self, id: CommandId) -> bool {
        cancellation::cancel_by_id(&self.inner.pipeline, &self.inner.transactions, &self.inner.in_flight, id)
    }

    pub fn cancel_by_kind(&self, kind: A::Kind) -> usize {
        cancellation::cancel_by_kind(&self.inner.pipeline, &self.inner.transactions, kind)
    }

    pub fn cancel_by_age(&self, max_age: Duration) -> usize {
        cancellation::cancel_by_age(&self.inner.pipeline, &self.inner.transactions, max_age)
    }

    pub fn cancel_all(&self) -> usize {
        cancellation::cancel_all(&self.inner.pipeline, &self.inner.transactions)
    }

    pub fn begin_transaction(&self) -> TransactionId {
        self.inner.transactions.begin()
    }

    pub fn set_transaction_priority(&self, id: TransactionId, priority: Priority) -> Result<(), EngineError> {
        self.inner.transactions.set_priority(id, priority)
    }

    pub fn set_transaction_flags(&self, id: TransactionId, flags: TransactionFlags) -> Result<(), EngineError> {
        self.inner.transactions.set_flags(id, flags)
    }

    pub fn set_transaction_timeout(&self, id: TransactionId, timeout: Duration) -> Result<(), EngineError> {
        self.inner.transactions.set_timeout(id, timeout)
    }

    pub fn add_to_transaction(&self, id: TransactionId, kind: A::Kind, params: A::Params) -> Result<(), EngineError> {
        self.inner.transactions.add(id, kind, params)
    }

    /// Atomically enqueues every member of the transaction, contiguous
    /// at its chosen priority. `callback` fires exactly once, when the
    /// last member resolves.
    pub fn commit_transaction(
        &self,
        id: TransactionId,
        callback: impl FnOnce(TransactionResult<A::Outcome>) + Send + 'static,
    ) -> Result<(), EngineError> {
        let (priority, entries) = self.inner.transactions.commit(id, Box::new(callback))?;
        let records: Vec<CommandRecord<A>> = entries
            .into_iter()
            .enumerate()
            .map(|(index, (kind, params))| CommandRecord {
                id: self.inner.ids.next_command(),
                kind,
                priority,
                submitted_at: std::time::Instant::now(),
                params,
                completion: Completion::Transaction(id, index),
                transaction_id: Some(id),
                cancelled: Arc::new(AtomicBool::new(false)),
            })
            .collect();
        self.inner.pipeline.push_transaction_batch(priority, records)
    }

    pub fn cancel_transaction(&self, id: TransactionId) -> Result<(), EngineError> {
        cancellation::cancel_transaction(&self.inner.pipeline, &self.inner.transactions, id)
    }
}

impl<A: DeviceAdapter> Drop for QueueManager<A> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.shutdown_inner();
        }
    }
}
