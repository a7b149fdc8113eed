//! Worker loop: the single thread that ever touches the adapter.
//! Everything else in this crate only ever talks to the pipeline, the
//! transaction registry, and the stats counters.

use crate::adapter::DeviceAdapter;
use crate::cancellation;
use crate::command::{CommandRecord, Completion};
use crate::error::{Disposition, ExecuteOutcome, FailureReason};
use crate::manager::ManagerInner;
use crate::transaction::TransactionRegistry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long `dequeue_one` blocks before the worker re-checks shutdown
/// and connection state. Small enough that `destroy()` returns quickly.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) fn run<A: DeviceAdapter>(inner: Arc<ManagerInner<A>>, mut adapter: A) {
    loop {
        if inner.shutdown.load(Ordering::Acquire) {
            break;
        }

        if !inner.supervisor.is_connected() {
            step_connection(&inner, &mut adapter);
            continue;
        }

        let Some(record) = inner.pipeline.dequeue_one(POLL_INTERVAL) else {
            continue;
        };
        dispatch_or_hold(&inner, &mut adapter, record);
    }

    let drained = cancellation::cancel_all(&inner.pipeline, &inner.transactions);
    if drained > 0 {
        debug!(drained, "cancelled queued commands during shutdown");
    }
    inner.supervisor.on_shutdown();
    adapter.disconnect();
}

fn step_connection<A: DeviceAdapter>(inner: &ManagerInner<A>, adapter: &mut A) {
    if !inner.supervisor.ready_to_retry() {
        std::thread::sleep(POLL_INTERVAL);
        return;
    }
    inner.supervisor.begin_reconnect_attempt();
    inner.config.emit("attempting to connect to device");
    match adapter.connect() {
        Ok(()) => {
            inner.supervisor.on_connect_success();
            info!("device connected");
            inner.config.emit("device connected");
        }
        Err(_) => {
            let attempts = inner.supervisor.on_connect_failure();
            inner.stats.record_reconnect_attempt();
            warn!(attempts, "connect attempt failed, backing off");
            inner
                .config
                .emit(format!("connect attempt {attempts} failed, backing off"));
        }
    }
}

fn dispatch_or_hold<A: DeviceAdapter>(inner: &Arc<ManagerInner<A>>, adapter: &mut A, first: CommandRecord<A>) {
    let Some(tid) = first.transaction_id else {
        dispatch_single(inner, adapter, first);
        return;
    };

    // Transaction hold: every member dispatches contiguously, with no
    // other command interleaved, regardless of what arrives in any
    // priority channel meanwhile.
    let total = inner.transactions.total(tid).unwrap_or(1);
    let priority = first.priority;
    let mut dispatched = 0usize;
    let mut current = Some(first);

    while let Some(record) = current.take() {
        dispatch_single(inner, adapter, record);
        dispatched += 1;
        if dispatched >= total {
            break;
        }
        if inner.transactions.is_aborted(tid) {
            for _ in dispatched..total {
                if let Some(remaining) = inner.pipeline.pop_held(priority) {
                    cancellation::resolve_cancelled(remaining, &inner.transactions);
                } else {
                    // The remaining member hasn't been enqueued yet in
                    // this rare race (commit and abort interleaved); it
                    // will be cancelled on arrival by cancel_transaction.
                    break;
                }
            }
            break;
        }
        current = inner.pipeline.pop_held(priority);
    }
}

fn dispatch_single<A: DeviceAdapter>(inner: &ManagerInner<A>, adapter: &mut A, record: CommandRecord<A>) {
    let CommandRecord {
        id,
        kind,
        priority: _,
        submitted_at: _,
        params,
        completion,
        transaction_id: _,
        cancelled,
    } = record;

    if cancelled.load(Ordering::Acquire) {
        deliver(completion, Disposition::Cancelled, &inner.transactions);
        return;
    }

    inner.in_flight.set(id, Arc::clone(&cancelled));
    let outcome = adapter.execute(kind, &params);
    inner.in_flight.clear(id);

    match outcome {
        ExecuteOutcome::Success(value) => {
            inner.stats.record_processed();
            debug!(name = adapter.name_of_kind(kind), "dispatch succeeded");
            let cooldown = adapter.cooldown_for_kind(kind);
            if !cooldown.is_zero() {
                std::thread::sleep(cooldown);
            }
            deliver(completion, Disposition::Completed(value), &inner.transactions);
        }
        ExecuteOutcome::LinkFailure => {
            inner.stats.record_processed();
            inner.stats.record_error();
            inner.supervisor.on_link_failure();
            warn!(name = adapter.name_of_kind(kind), "link failure during dispatch");
            inner.config.emit("link failure, will attempt to reconnect");
            deliver(
                completion,
                Disposition::Failed(FailureReason::Link),
                &inner.transactions,
            );
        }
        ExecuteOutcome::Timeout => {
            inner.stats.record_processed();
            inner.stats.record_error();
            deliver(
                completion,
                Disposition::Failed(FailureReason::Timeout),
                &inner.transactions,
            );
        }
        ExecuteOutcome::CommandFailed(message) => {
            inner.stats.record_processed();
            inner.stats.record_error();
            deliver(
                completion,
                Disposition::Failed(FailureReason::Command(message)),
                &inner.transactions,
            );
        }
    }
}

fn deliver<A: DeviceAdapter>(
    completion: Completion<A::Outcome>,
    disposition: Disposition<A::Outcome>,
    registry: &TransactionRegistry<A>,
) {
    match completion {
        Completion::Blocking(rendezvous) => rendezvous.resolve(disposition),
        Completion::Callback(callback) => callback(disposition),
        Completion::Transaction(tid, index) => registry.notify_member_resolved(tid, index, disposition),
    }
}
