//! Cancellation engine. All operations here mark
//! commands; none tear out the worker thread or interrupt an adapter
//! call in progress.

use crate::adapter::DeviceAdapter;
use crate::command::{CommandId, CommandRecord, TransactionId};
use crate::error::{Disposition, EngineError};
use crate::inflight::InFlight;
use crate::pipeline::PriorityPipeline;
use crate::transaction::TransactionRegistry;
use std::time::{Duration, Instant};

pub(crate) fn resolve_cancelled<A: DeviceAdapter>(record: CommandRecord<A>, registry: &TransactionRegistry<A>) {
    match record.completion {
        crate::command::Completion::Blocking(rendezvous) => {
            rendezvous.resolve(Disposition::Cancelled);
        }
        crate::command::Completion::Callback(callback) => {
            callback(Disposition::Cancelled);
        }
        crate::command::Completion::Transaction(tid, index) => {
            registry.notify_member_resolved(tid, index, Disposition::Cancelled);
        }
    }
}

pub(crate) fn cancel_by_id<A: DeviceAdapter>(
    pipeline: &PriorityPipeline<A>,
    registry: &TransactionRegistry<A>,
    in_flight: &InFlight,
    id: CommandId,
) -> bool {
    let mut found = false;
    pipeline.remove_by_id(id, |record| {
        found = true;
        resolve_cancelled(record, registry);
    });
    if found {
        return true;
    }
    in_flight.try_flag(id)
}

pub(crate) fn cancel_by_kind<A: DeviceAdapter>(
    pipeline: &PriorityPipeline<A>,
    registry: &TransactionRegistry<A>,
    kind: A::Kind,
) -> usize {
    let mut count = 0;
    pipeline.remove_by(
        |record| record.kind == kind,
        |record| {
            count += 1;
            resolve_cancelled(record, registry);
        },
    );
    count
}

pub(crate) fn cancel_by_age<A: DeviceAdapter>(
    pipeline: &PriorityPipeline<A>,
    registry: &TransactionRegistry<A>,
    max_age: Duration,
) -> usize {
    let now = Instant::now();
    let mut count = 0;
    pipeline.remove_by(
        |record| now.saturating_duration_since(record.submitted_at) > max_age,
        |record| {
            count += 1;
            resolve_cancelled(record, registry);
        },
    );
    count
}

pub(crate) fn cancel_all<A: DeviceAdapter>(pipeline: &PriorityPipeline<A>, registry: &TransactionRegistry<A>) -> usize {
    let mut count = 0;
    pipeline.drain_all(|record| {
        count += 1;
        resolve_cancelled(record, registry);
    });
    count
}

/// Cancels a transaction: uncommitted transactions are disposed
/// outright; committed ones are marked aborted (so the worker's hold
/// loop stops after the currently-dispatching member) and any members
/// still sitting in the pipeline are pulled out and resolved as
/// `Cancelled` right away. The aggregated callback still fires exactly
/// once, once the in-flight member (if any) resolves.
pub(crate) fn cancel_transaction<A: DeviceAdapter>(
    pipeline: &PriorityPipeline<A>,
    registry: &TransactionRegistry<A>,
    id: TransactionId,
) -> Result<(), EngineError> {
    registry.cancel(id)?;
    pipeline.remove_by(
        |record| record.transaction_id == Some(id),
        |record| resolve_cancelled(record, registry),
    );
    Ok(())
}
