//! Throughput of the worker loop against a zero-latency mock adapter:
//! how many blocking submits per second the single-threaded dispatch
//! path can sustain once connected.

use benchqueue_core::mock::{MockAdapter, MockKind, MockParams};
use benchqueue_core::{ManagerConfig, Priority, QueueManager};
use criterion::{criterion_group, criterion_main, Criterion};
use std::time::Duration;

fn wait_connected(mgr: &QueueManager<MockAdapter>) {
    for _ in 0..200 {
        if mgr.get_stats().is_connected {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("manager never connected");
}

fn dispatch_throughput(c: &mut Criterion) {
    let mgr = QueueManager::create(MockAdapter::new(), ManagerConfig::default());
    wait_connected(&mgr);

    c.bench_function("submit_blocking echo", |b| {
        b.iter(|| {
            let outcome = mgr.submit_blocking(MockKind::Echo, MockParams { value: 1 }, Priority::Normal, Some(1_000));
            assert!(matches!(outcome, benchqueue_core::BlockingOutcome::Success(_)));
        });
    });

    mgr.destroy();
}

criterion_group!(benches, dispatch_throughput);
criterion_main!(benches);
