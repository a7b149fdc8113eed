//! Property tests for the engine's ordering and accounting invariants,
//! exercised through the public API against the mock adapter.

use benchqueue_core::mock::{MockAdapter, MockKind, MockParams};
use benchqueue_core::{ManagerConfig, Priority, QueueManager};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::{mpsc, Arc};
use std::time::Duration;

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::High), Just(Priority::Normal), Just(Priority::Low)]
}

fn wait_connected(mgr: &QueueManager<MockAdapter>) {
    for _ in 0..400 {
        if mgr.get_stats().is_connected {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("manager never connected");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // Invariant: within a single priority level, commands complete in
    // the order they were submitted, regardless of how many other
    // priorities are interleaved in the submission sequence. A single
    // worker thread means completion order is dispatch order.
    #[test]
    fn fifo_within_priority_is_preserved(
        priorities in prop::collection::vec(priority_strategy(), 1..24)
    ) {
        let adapter = MockAdapter::new();
        adapter.knobs.set_delay(Duration::from_millis(1));
        let mgr = QueueManager::create(adapter, ManagerConfig::default());
        wait_connected(&mgr);

        let total = priorities.len();
        let completions: Arc<Mutex<Vec<(Priority, i64)>>> = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::channel();

        for (i, p) in priorities.iter().enumerate() {
            let value = i as i64;
            let completions = Arc::clone(&completions);
            let tx = tx.clone();
            let p = *p;
            mgr.submit_async(MockKind::Echo, MockParams { value }, p, move |_| {
                completions.lock().push((p, value));
                tx.send(()).unwrap();
            });
        }
        for _ in 0..total {
            rx.recv_timeout(Duration::from_secs(10)).unwrap();
        }

        let log = completions.lock();
        for level in [Priority::High, Priority::Normal, Priority::Low] {
            let mut seen = log.iter().filter(|(p, _)| *p == level).map(|(_, v)| *v);
            let mut previous = None;
            for value in seen.by_ref() {
                if let Some(prev) = previous {
                    prop_assert!(value > prev, "FIFO violated within {:?}: {} after {}", level, value, prev);
                }
                previous = Some(value);
            }
        }

        mgr.destroy();
    }
}

// Invariant: transaction aggregation always reports
// success_count + failure_count == the number of members committed, and
// exactly one result slot per member.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn transaction_result_counts_cover_every_member(
        outcomes in prop::collection::vec(any::<bool>(), 1..8)
    ) {
        let adapter = MockAdapter::new();
        let mgr = QueueManager::create(adapter, ManagerConfig::default());
        wait_connected(&mgr);

        let tid = mgr.begin_transaction();
        let total = outcomes.len();
        for (i, succeed) in outcomes.iter().enumerate() {
            let kind = if *succeed { MockKind::Echo } else { MockKind::Fail };
            mgr.add_to_transaction(tid, kind, MockParams { value: i as i64 }).unwrap();
        }

        let (tx, rx) = mpsc::channel();
        mgr.commit_transaction(tid, move |result| tx.send(result).unwrap()).unwrap();
        let result = rx.recv_timeout(Duration::from_secs(10)).unwrap();

        prop_assert_eq!(result.success_count + result.failure_count, total);
        prop_assert_eq!(result.results.len(), total);

        mgr.destroy();
    }
}

// Invariant: statistics are monotonic and every dispatched command is
// reflected exactly once in either total_processed's successes or the
// error counter, never both and never neither.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn stats_account_for_every_dispatch(
        failures in prop::collection::vec(any::<bool>(), 1..16)
    ) {
        let adapter = MockAdapter::new();
        let mgr = QueueManager::create(adapter, ManagerConfig::default());
        wait_connected(&mgr);

        let total = failures.len();
        let (tx, rx) = mpsc::channel();
        for fail in &failures {
            let kind = if *fail { MockKind::Fail } else { MockKind::Echo };
            let tx = tx.clone();
            mgr.submit_async(kind, MockParams { value: 0 }, Priority::Normal, move |_| {
                tx.send(()).unwrap()
            });
        }
        for _ in 0..total {
            rx.recv_timeout(Duration::from_secs(10)).unwrap();
        }

        let stats = mgr.get_stats();
        let expected_errors = failures.iter().filter(|f| **f).count() as u64;
        prop_assert_eq!(stats.total_processed, total as u64);
        prop_assert_eq!(stats.total_errors, expected_errors);

        mgr.destroy();
    }
}
