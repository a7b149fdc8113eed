//! Statistics snapshot. Counters are monotonic and are
//! only ever incremented from the worker thread; reads take an atomic
//! snapshot with no locking beyond the pipeline's own depth query.

use crate::supervisor::ConnectionState;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct StatsInner {
    pub total_processed: AtomicU64,
    pub total_errors: AtomicU64,
    pub reconnect_attempts: AtomicU64,
}

impl StatsInner {
    pub fn record_processed(&self) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }
}

/// Atomic snapshot returned by [`crate::manager::QueueManager::get_stats`].
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_processed: u64,
    pub total_errors: u64,
    pub reconnect_attempts: u64,
    pub high_queued: usize,
    pub normal_queued: usize,
    pub low_queued: usize,
    pub is_connected: bool,
    pub is_processing: bool,
    pub connection_state: ConnectionState,
}
