//! Generic asynchronous device-command queue manager.
//!
//! This crate is the device-agnostic engine: a prioritized, cancellable,
//! transactional command pipeline that serializes access to one slow,
//! failure-prone external device through a single worker thread, with
//! automatic reconnection. Concrete devices plug in by implementing
//! [`DeviceAdapter`]; see the `echem-adapter` crate for a worked example.

mod adapter;
mod cancellation;
mod command;
mod config;
mod error;
mod inflight;
mod manager;
mod pipeline;
mod rendezvous;
mod stats;
mod supervisor;
mod transaction;
mod worker;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use adapter::DeviceAdapter;
pub use command::{CancelToken, CommandId, Priority, TransactionId};
pub use config::{LogSink, ManagerConfig};
pub use error::{BlockingOutcome, Disposition, EngineError, ExecuteOutcome, FailureReason, Result};
pub use manager::QueueManager;
pub use stats::Stats;
pub use supervisor::ConnectionState;
pub use transaction::{TransactionFlags, TransactionResult};
