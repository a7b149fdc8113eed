use benchqueue_core::{ManagerConfig, Priority, QueueManager};
use echem_adapter::{EchemAdapter, EchemKind, EchemOutcome, EchemParams};
use std::sync::mpsc;
use std::time::Duration;

fn wait_connected(mgr: &QueueManager<EchemAdapter>) {
    for _ in 0..200 {
        if mgr.get_stats().is_connected {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("manager never connected");
}

#[test]
fn open_circuit_voltage_round_trips_through_the_engine() {
    let mgr = QueueManager::create(EchemAdapter::loopback(), ManagerConfig::default());
    wait_connected(&mgr);

    let outcome = mgr.submit_blocking(
        EchemKind::OpenCircuitVoltage,
        EchemParams::OpenCircuitVoltage { settle_time_ms: 500 },
        Priority::Normal,
        Some(2_000),
    );
    match outcome {
        benchqueue_core::BlockingOutcome::Success(EchemOutcome::OpenCircuitVoltage { voltage_v }) => {
            assert!(voltage_v > 0.0);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    mgr.destroy();
}

#[test]
fn impedance_sweep_returns_one_point_per_requested_frequency() {
    let mgr = QueueManager::create(EchemAdapter::loopback(), ManagerConfig::default());
    wait_connected(&mgr);

    let (tx, rx) = mpsc::channel();
    mgr.submit_async(
        EchemKind::ImpedanceSpectroscopy,
        EchemParams::ImpedanceSpectroscopy {
            start_freq_hz: 1.0,
            end_freq_hz: 100_000.0,
            points: 10,
        },
        Priority::Normal,
        move |d| tx.send(d).unwrap(),
    );
    match rx.recv_timeout(Duration::from_secs(2)).unwrap() {
        benchqueue_core::Disposition::Completed(EchemOutcome::ImpedanceSpectroscopy { points }) => {
            assert_eq!(points.len(), 10);
        }
        other => panic!("unexpected disposition: {other:?}"),
    }
    mgr.destroy();
}

#[test]
fn zero_point_sweep_is_reported_as_a_command_failure_not_a_panic() {
    let mgr = QueueManager::create(EchemAdapter::loopback(), ManagerConfig::default());
    wait_connected(&mgr);

    let outcome = mgr.submit_blocking(
        EchemKind::ImpedanceSpectroscopy,
        EchemParams::ImpedanceSpectroscopy {
            start_freq_hz: 1.0,
            end_freq_hz: 10.0,
            points: 0,
        },
        Priority::Normal,
        Some(2_000),
    );
    assert!(matches!(
        outcome,
        benchqueue_core::BlockingOutcome::Failed(benchqueue_core::FailureReason::Command(_))
    ));
    mgr.destroy();
}

#[test]
fn non_positive_charge_current_is_rejected_by_the_technique() {
    let mgr = QueueManager::create(EchemAdapter::loopback(), ManagerConfig::default());
    wait_connected(&mgr);

    let outcome = mgr.submit_blocking(
        EchemKind::GalvanostaticCharge,
        EchemParams::GalvanostaticCharge {
            current_a: 0.0,
            cutoff_voltage_v: 4.2,
            max_duration_s: 60,
        },
        Priority::Normal,
        Some(2_000),
    );
    assert!(matches!(
        outcome,
        benchqueue_core::BlockingOutcome::Failed(benchqueue_core::FailureReason::Command(_))
    ));
    mgr.destroy();
}
