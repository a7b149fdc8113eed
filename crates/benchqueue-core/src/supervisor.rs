//! Connection supervisor: embedded in the worker,
//! drives exponential-backoff reconnection and parks work while down.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Reconnecting,
}

impl ConnectionState {
    fn to_tag(self) -> u8 {
        match self {
            ConnectionState::Connected => 0,
            ConnectionState::Disconnected => 1,
            ConnectionState::Reconnecting => 2,
        }
    }

    fn from_tag(tag: u8) -> Self {
        match tag {
            0 => ConnectionState::Connected,
            2 => ConnectionState::Reconnecting,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// `min(base * 2^min(attempts, max_shift), max)`, in milliseconds.
pub fn backoff_delay_ms(base_ms: u64, max_ms: u64, attempts: u32, max_shift: u32) -> u64 {
    let shift = attempts.min(max_shift);
    let factor = 1u64.checked_shl(shift).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(max_ms)
}

/// Tracks connection state, reconnect attempt count, and the next retry
/// deadline. Read and written only from the worker thread, except for
/// the `state()` snapshot used by `get_stats`.
pub(crate) struct ConnectionSupervisor {
    state: AtomicU8,
    attempts: AtomicU32,
    next_retry: Mutex<Instant>,
    base_ms: u64,
    max_ms: u64,
    max_shift: u32,
}

impl ConnectionSupervisor {
    pub fn new(base_ms: u64, max_ms: u64, max_shift: u32) -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected.to_tag()),
            attempts: AtomicU32::new(0),
            next_retry: Mutex::new(Instant::now()),
            base_ms,
            max_ms,
            max_shift,
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_tag(self.state.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state.to_tag(), Ordering::Release);
    }

    /// A command or liveness probe reported a link failure.
    pub fn on_link_failure(&self) {
        self.set_state(ConnectionState::Disconnected);
        *self.next_retry.lock() = Instant::now();
    }

    pub fn ready_to_retry(&self) -> bool {
        Instant::now() >= *self.next_retry.lock()
    }

    pub fn begin_reconnect_attempt(&self) {
        self.set_state(ConnectionState::Reconnecting);
    }

    pub fn on_connect_success(&self) {
        self.set_state(ConnectionState::Connected);
        self.attempts.store(0, Ordering::Relaxed);
    }

    /// Schedules the next retry with exponential backoff and returns the
    /// new attempt count, for statistics.
    pub fn on_connect_failure(&self) -> u32 {
        let attempts = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        let delay = backoff_delay_ms(self.base_ms, self.max_ms, attempts, self.max_shift);
        *self.next_retry.lock() = Instant::now() + Duration::from_millis(delay);
        self.set_state(ConnectionState::Disconnected);
        attempts
    }

    pub fn on_shutdown(&self) {
        self.set_state(ConnectionState::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_geometric_until_cap() {
        assert_eq!(backoff_delay_ms(100, 10_000, 0, 5), 100);
        assert_eq!(backoff_delay_ms(100, 10_000, 1, 5), 200);
        assert_eq!(backoff_delay_ms(100, 10_000, 2, 5), 400);
        assert_eq!(backoff_delay_ms(100, 10_000, 5, 5), 3200);
        // attempts beyond max_shift do not keep doubling past the cap
        assert_eq!(backoff_delay_ms(100, 10_000, 6, 5), 3200);
        assert_eq!(backoff_delay_ms(100, 1_000, 10, 5), 1_000);
    }
}
