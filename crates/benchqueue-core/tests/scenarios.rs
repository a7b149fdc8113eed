//! Deterministic end-to-end scenarios (S1-S6): priority ordering,
//! transaction atomicity and abort, cancellation at each stage, and
//! reconnect-then-drain.

use benchqueue_core::mock::{MockAdapter, MockKind, MockParams};
use benchqueue_core::{BlockingOutcome, ManagerConfig, Priority, QueueManager, TransactionFlags};
use std::sync::mpsc;
use std::time::Duration;

fn manager() -> QueueManager<MockAdapter> {
    QueueManager::create(MockAdapter::new(), ManagerConfig::default())
}

fn wait_connected(mgr: &QueueManager<MockAdapter>) {
    for _ in 0..200 {
        if mgr.get_stats().is_connected {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("manager never connected");
}

// S1: High-priority commands submitted after Normal ones still dispatch
// first, as long as they arrive before the worker drains the queue.
#[test]
fn s1_high_priority_preempts_normal() {
    let adapter = MockAdapter::new();
    adapter.knobs.set_delay(Duration::from_millis(50));
    let mgr = QueueManager::create(adapter, ManagerConfig::default());
    wait_connected(&mgr);

    let (tx, rx) = mpsc::channel();
    // Hold the worker busy on a slow Normal command so both a queued
    // Normal and a queued High are waiting when it finishes.
    mgr.submit_async(
        MockKind::Echo,
        MockParams { value: -1 },
        Priority::Normal,
        {
            let tx = tx.clone();
            move |_| tx.send(-1).unwrap()
        },
    );
    // Give the worker a moment to pick up the first command so the two
    // below are both sitting in their queues together.
    std::thread::sleep(Duration::from_millis(20));

    mgr.submit_async(MockKind::Echo, MockParams { value: 1 }, Priority::Normal, {
        let tx = tx.clone();
        move |_| tx.send(1).unwrap()
    });
    mgr.submit_async(MockKind::Echo, MockParams { value: 2 }, Priority::High, {
        let tx = tx.clone();
        move |_| tx.send(2).unwrap()
    });

    let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(first, -1, "the already in-flight command finishes first");
    let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(second, 2, "High beats the previously queued Normal");
    let third = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(third, 1);

    mgr.destroy();
}

// S2: a committed transaction's members dispatch contiguously even when
// unrelated commands are submitted to the same priority while it runs.
#[test]
fn s2_transaction_members_are_contiguous() {
    let mgr = manager();
    wait_connected(&mgr);

    let tid = mgr.begin_transaction();
    for v in [10, 11, 12] {
        mgr.add_to_transaction(tid, MockKind::Echo, MockParams { value: v }).unwrap();
    }
    let (tx, rx) = mpsc::channel();
    mgr.commit_transaction(tid, move |result| tx.send(result).unwrap()).unwrap();

    // Race an unrelated Normal command in right behind it.
    let (tx2, rx2) = mpsc::channel();
    mgr.submit_async(MockKind::Echo, MockParams { value: 99 }, Priority::Normal, move |d| {
        tx2.send(d).unwrap()
    });

    let result = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(result.success_count, 3);
    assert_eq!(result.failure_count, 0);

    rx2.recv_timeout(Duration::from_secs(2)).unwrap();
    mgr.destroy();
}

// S3: abort-on-error stops dispatching remaining members and resolves
// them as Cancelled without invoking the adapter.
#[test]
fn s3_abort_on_error_cancels_remaining_members() {
    let mgr = manager();
    wait_connected(&mgr);

    let tid = mgr.begin_transaction();
    mgr.set_transaction_flags(tid, TransactionFlags { abort_on_error: true }).unwrap();
    mgr.add_to_transaction(tid, MockKind::Echo, MockParams { value: 1 }).unwrap();
    mgr.add_to_transaction(tid, MockKind::Fail, MockParams { value: 2 }).unwrap();
    mgr.add_to_transaction(tid, MockKind::Echo, MockParams { value: 3 }).unwrap();

    let (tx, rx) = mpsc::channel();
    mgr.commit_transaction(tid, move |result| tx.send(result).unwrap()).unwrap();

    let result = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(result.success_count, 1);
    assert_eq!(result.failure_count, 2);
    mgr.destroy();
}

// S4: cancelling a command while it is still queued aborts it before
// the adapter ever sees it.
#[test]
fn s4_cancel_before_dispatch_never_touches_adapter() {
    let adapter = MockAdapter::new();
    let knobs = adapter.knobs.clone();
    let trace = adapter.trace.clone();
    // Slow everything down so the command under test is guaranteed to
    // still be queued, not in flight, when `cancel` is called below.
    knobs.set_delay(Duration::from_millis(200));
    let mgr = QueueManager::create(adapter, ManagerConfig::default());
    wait_connected(&mgr);

    // Jam the worker on a slow in-flight command first.
    mgr.submit_async(MockKind::Echo, MockParams { value: 0 }, Priority::Normal, |_| {});
    std::thread::sleep(Duration::from_millis(20));

    let (tx, rx) = mpsc::channel();
    let token = mgr
        .submit_async(MockKind::Echo, MockParams { value: 7 }, Priority::Low, move |d| {
            tx.send(d).unwrap()
        })
        .unwrap();
    token.cancel();

    let disposition = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(matches!(disposition, benchqueue_core::Disposition::Cancelled));
    assert_eq!(
        trace.lock().len(),
        1,
        "only the jamming command should have reached the adapter"
    );
    mgr.destroy();
}

// S5: a blocking submit against a disconnected-but-failing-to-connect
// adapter eventually reports the caller's own timeout without the
// manager itself unwinding.
#[test]
fn s5_blocking_submit_times_out_while_disconnected() {
    let adapter = MockAdapter::new();
    adapter.knobs.set_connect_should_fail(true);
    let mgr = QueueManager::create(adapter, ManagerConfig::default());

    let outcome = mgr.submit_blocking(MockKind::Echo, MockParams { value: 1 }, Priority::Normal, Some(150));
    assert!(matches!(outcome, BlockingOutcome::Timeout));
    mgr.destroy();
}

// S6: once the adapter starts succeeding again after initial connect
// failures, queued work drains normally.
#[test]
fn s6_recovers_and_drains_after_initial_connect_failures() {
    let adapter = MockAdapter::new();
    let knobs = adapter.knobs.clone();
    knobs.set_connect_should_fail(true);
    let mgr = QueueManager::create(adapter, ManagerConfig {
        reconnect_base_ms: 10,
        reconnect_max_ms: 50,
        ..ManagerConfig::default()
    });

    std::thread::sleep(Duration::from_millis(60));
    knobs.set_connect_should_fail(false);
    wait_connected(&mgr);

    let outcome = mgr.submit_blocking(MockKind::Echo, MockParams { value: 42 }, Priority::Normal, Some(2_000));
    match outcome {
        BlockingOutcome::Success(v) => assert_eq!(v.value, 42),
        other => panic!("expected success once reconnected, got {other:?}"),
    }
    mgr.destroy();
}
