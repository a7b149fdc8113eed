//! A configurable in-memory adapter used by this crate's own tests and
//! by downstream adapter authors writing property tests against the
//! engine. Enabled by the `test-util` feature.

use crate::adapter::DeviceAdapter;
use crate::error::{EngineError, ExecuteOutcome};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockKind {
    /// Echoes `MockParams::value` back in `MockOutcome::value`, for the
    /// round-trip-preservation property.
    Echo,
    /// Always resolves as `CommandFailed`.
    Fail,
    Set,
    Get,
}

#[derive(Debug, Clone, Default)]
pub struct MockParams {
    pub value: i64,
}

#[derive(Debug, Clone, Default)]
pub struct MockOutcome {
    pub value: i64,
}

/// Shared knobs a test can flip while commands are in flight.
#[derive(Clone)]
pub struct MockKnobs {
    connect_should_fail: Arc<AtomicBool>,
    per_command_delay: Arc<Mutex<Duration>>,
    /// When `Some(n)`, every `n`th dispatched command (1-indexed) fails
    /// as a `CommandFailed` instead of succeeding. Deterministic, unlike
    /// a random failure rate, so tests can assert exact call counts.
    fail_every_nth: Arc<Mutex<Option<u32>>>,
    dispatch_count: Arc<AtomicU32>,
    /// When set, `execute` reports a timeout instead of running at all.
    simulate_timeout: Arc<AtomicBool>,
}

impl Default for MockKnobs {
    fn default() -> Self {
        Self {
            connect_should_fail: Arc::new(AtomicBool::new(false)),
            per_command_delay: Arc::new(Mutex::new(Duration::ZERO)),
            fail_every_nth: Arc::new(Mutex::new(None)),
            dispatch_count: Arc::new(AtomicU32::new(0)),
            simulate_timeout: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl MockKnobs {
    pub fn set_connect_should_fail(&self, fail: bool) {
        self.connect_should_fail.store(fail, Ordering::Release);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.per_command_delay.lock() = delay;
    }

    pub fn set_fail_every_nth(&self, n: Option<u32>) {
        *self.fail_every_nth.lock() = n;
    }

    pub fn set_simulate_timeout(&self, on: bool) {
        self.simulate_timeout.store(on, Ordering::Release);
    }

    pub fn dispatch_count(&self) -> u32 {
        self.dispatch_count.load(Ordering::Acquire)
    }
}

/// A mock device: connects instantly (unless told to fail), executes
/// after an optional configurable delay, and can be steered to fail or
/// "time out" deterministically.
pub struct MockAdapter {
    pub knobs: MockKnobs,
    connected: bool,
    /// Ordered trace of every kind actually passed to `execute`, for
    /// assertions about dispatch order (priority, transaction atomicity).
    pub trace: Arc<Mutex<Vec<MockKind>>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self {
            knobs: MockKnobs::default(),
            connected: false,
            trace: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_knobs(knobs: MockKnobs) -> Self {
        Self {
            knobs,
            connected: false,
            trace: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceAdapter for MockAdapter {
    type Kind = MockKind;
    type Params = MockParams;
    type Outcome = MockOutcome;

    fn connect(&mut self) -> Result<(), EngineError> {
        if self.knobs.connect_should_fail.load(Ordering::Acquire) {
            return Err(EngineError::InvalidState);
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn test_liveness(&mut self) -> bool {
        self.connected
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn execute(&mut self, kind: Self::Kind, params: &Self::Params) -> ExecuteOutcome<Self::Outcome> {
        self.trace.lock().push(kind);
        let delay = *self.knobs.per_command_delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        if self.knobs.simulate_timeout.load(Ordering::Acquire) {
            return ExecuteOutcome::Timeout;
        }

        let dispatch_index = self.knobs.dispatch_count.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(n) = *self.knobs.fail_every_nth.lock() {
            if n > 0 && dispatch_index % n == 0 {
                return ExecuteOutcome::CommandFailed("mock: scheduled failure".into());
            }
        }

        match kind {
            MockKind::Fail => ExecuteOutcome::CommandFailed("mock: Fail kind always fails".into()),
            MockKind::Echo | MockKind::Set | MockKind::Get => {
                ExecuteOutcome::Success(MockOutcome { value: params.value })
            }
        }
    }

    fn name_of_kind(&self, kind: Self::Kind) -> &'static str {
        match kind {
            MockKind::Echo => "echo",
            MockKind::Fail => "fail",
            MockKind::Set => "set",
            MockKind::Get => "get",
        }
    }

    fn cooldown_for_kind(&self, _kind: Self::Kind) -> Duration {
        Duration::ZERO
    }
}
