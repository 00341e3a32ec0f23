use callflow_monitoring::{MonitoringConfig, OrchestratorMetrics};
use std::sync::Arc;
use std::thread;

#[test]
fn test_snapshot_serializes_camel_case() {
    let metrics = OrchestratorMetrics::new();
    metrics.record_session_started("flow-42");
    metrics.record_non_fatal("speech_recognition.arm_recognition");

    let value = serde_json::to_value(metrics.snapshot()).unwrap();
    assert_eq!(value["sessionsStarted"], 1);
    assert_eq!(value["nonFatalFailures"], 1);
    assert_eq!(value["continuationsDiscarded"], 0);
}

#[test]
fn test_counters_are_shared_across_threads() {
    let metrics = Arc::new(OrchestratorMetrics::new());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let metrics = metrics.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    metrics.record_continuation_scheduled();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(metrics.snapshot().continuations_scheduled, 100);
}

#[test]
fn test_init_twice_fails_second_time() {
    let config = MonitoringConfig {
        log_filter: "warn".to_string(),
        ..Default::default()
    };

    // Only the first global subscriber can be installed per process.
    let first = callflow_monitoring::init(&config);
    let second = callflow_monitoring::init(&config);
    assert!(first.is_ok());
    assert!(second.is_err());
}
