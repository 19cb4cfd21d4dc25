//! End-to-end behaviour of the telemetry pipeline through the public API

use approx::assert_relative_eq;
use pulse_core::config::Thresholds;
use pulse_core::core::{AlertSeverity, AlertType, TelemetryError};
use pulse_core::persistence::{PersistenceRecord, PersistenceWorker};
use pulse_core::reporting::HealthStatus;
use pulse_core::telemetry::{ResourceSample, TelemetryEngine};
use pulse_core::testing::{at_offset, minutes, outcome, quiet_sample, MemorySink, ScriptedProbe};
use std::sync::Arc;
use std::time::Duration;

fn engine() -> TelemetryEngine {
    TelemetryEngine::new(
        Thresholds::default(),
        Box::new(ScriptedProbe::new(quiet_sample())),
        None,
    )
    .unwrap()
}

#[test]
fn test_window_counts_within_and_resets_after() {
    let engine = engine();
    engine.record_at(outcome("GET", "/w", 500, 10), at_offset(minutes(0)));
    engine.record_at(outcome("GET", "/w", 200, 10), at_offset(minutes(4)));
    assert_eq!(engine.store().windows().state("/w").unwrap().total_count, 2);

    // Exactly at the window length: not yet stale
    engine.record_at(outcome("GET", "/w", 200, 10), at_offset(minutes(5)));
    assert_eq!(engine.store().windows().state("/w").unwrap().total_count, 3);

    // More than the window length after the window start: starts over
    let metric = engine.record_at(
        outcome("GET", "/w", 200, 10),
        at_offset(minutes(5) + Duration::from_millis(1)),
    );
    let store = engine.store();
    let state = store.windows().state("/w").unwrap();
    assert_eq!(state.total_count, 1);
    assert_eq!(state.error_count, 0);
    assert_eq!(metric.error_rate_at_capture, 0.0);
}

#[test]
fn test_response_time_thresholds() {
    let engine = engine();
    engine.record_at(outcome("GET", "/a", 200, 6_000), at_offset(minutes(0)));
    engine.record_at(outcome("GET", "/a", 200, 11_000), at_offset(minutes(0)));

    let store = engine.store();
    let severities: Vec<_> = store.alerts().iter().map(|a| a.severity).collect();
    assert_eq!(severities, vec![AlertSeverity::High, AlertSeverity::Critical]);
    assert!(store
        .alerts()
        .iter()
        .all(|a| a.alert_type == AlertType::Performance));
}

#[test]
fn test_cooldown_suppression() {
    let engine = engine();
    engine.record_at(outcome("GET", "/a", 200, 6_000), at_offset(minutes(0)));
    engine.record_at(outcome("GET", "/a", 200, 6_000), at_offset(minutes(5)));
    assert_eq!(engine.store().alerts().len(), 1);

    engine.record_at(outcome("GET", "/a", 200, 6_000), at_offset(minutes(20)));
    assert_eq!(engine.store().alerts().len(), 2);
}

#[test]
fn test_resolved_alert_does_not_suppress() {
    let engine = engine();
    engine.record_at(outcome("GET", "/a", 200, 6_000), at_offset(minutes(0)));
    let id = engine.store().alerts()[0].id.clone();
    engine.resolve_alert(&id, at_offset(minutes(1))).unwrap();

    engine.record_at(outcome("GET", "/a", 200, 6_000), at_offset(minutes(2)));
    assert_eq!(engine.store().alerts().len(), 2);
}

#[test]
fn test_retention_keeps_unresolved_alerts() {
    let engine = engine();
    engine.record_at(outcome("GET", "/old", 200, 6_000), at_offset(minutes(0)));
    let id = engine.store().alerts()[0].id.clone();

    // 25 hours later the metric is gone, the unresolved alert is not
    engine.record_at(outcome("GET", "/new", 200, 10), at_offset(minutes(25 * 60)));
    {
        let store = engine.store();
        assert!(store.metrics().iter().all(|m| m.path == "/new"));
        assert_eq!(store.alerts().len(), 1);
    }

    // Once resolved it is past the horizon and goes on the next sweep
    engine.resolve_alert(&id, at_offset(minutes(25 * 60))).unwrap();
    engine.record_at(outcome("GET", "/new", 200, 10), at_offset(minutes(25 * 60 + 1)));
    assert!(engine.store().alerts().is_empty());
}

#[test]
fn test_resolve_unknown_and_twice() {
    let sink = MemorySink::new();
    let records = sink.records();
    let engine = TelemetryEngine::new(
        Thresholds::default(),
        Box::new(ScriptedProbe::new(quiet_sample())),
        Some(PersistenceWorker::spawn(sink, 16)),
    )
    .unwrap();

    let err = engine.resolve_alert("nope", at_offset(minutes(0))).unwrap_err();
    assert!(matches!(err, TelemetryError::AlertNotFound { ref id } if id == "nope"));

    engine.record_at(outcome("GET", "/a", 200, 6_000), at_offset(minutes(0)));
    let id = engine.store().alerts()[0].id.clone();
    assert!(engine.resolve_alert(&id, at_offset(minutes(1))).unwrap().resolved);
    assert!(engine.resolve_alert(&id, at_offset(minutes(2))).unwrap().resolved);
    assert_eq!(engine.metrics().alerts_resolved_total.get(), 1);
    drop(engine);

    let records = records.lock();
    assert_eq!(records.len(), 1);
    assert!(matches!(&records[0], PersistenceRecord::AlertResolved { id: rid, .. } if *rid == id));
}

#[test]
fn test_health_escalation() {
    let probe = Arc::new(ScriptedProbe::new(quiet_sample()));
    let engine =
        TelemetryEngine::new(Thresholds::default(), Box::new(Arc::clone(&probe)), None).unwrap();
    let now = at_offset(minutes(1));

    assert_eq!(engine.health(now).status, HealthStatus::Healthy);

    engine.record_at(outcome("GET", "/a", 200, 6_000), now);
    assert_eq!(engine.health(now).status, HealthStatus::Degraded);

    engine.record_at(outcome("GET", "/a", 200, 11_000), now);
    let report = engine.health(now);
    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert_eq!(report.active_alerts, 2);

    // Memory over the limit is unhealthy on its own
    engine.reset();
    probe.set(ResourceSample::from_bytes(91, 100, 0.0));
    assert_eq!(engine.health(now).status, HealthStatus::Unhealthy);

    // Failed probe still answers
    probe.fail();
    let report = engine.health(now);
    assert_eq!(report.status, HealthStatus::Healthy);
    assert_eq!(report.memory.usage_fraction, 0.0);
}

#[test]
fn test_memory_pressure_raises_resource_alert() {
    let engine = TelemetryEngine::new(
        Thresholds::default(),
        Box::new(ScriptedProbe::new(ResourceSample::from_bytes(96, 100, 0.0))),
        None,
    )
    .unwrap();

    let mut request = outcome("GET", "/a", 200, 10);
    request.resources = ResourceSample::from_bytes(96, 100, 0.0);
    engine.record_at(request, at_offset(minutes(0)));

    let store = engine.store();
    assert_eq!(store.alerts().len(), 1);
    assert_eq!(store.alerts()[0].alert_type, AlertType::Resource);
    assert_eq!(store.alerts()[0].severity, AlertSeverity::Critical);
}

#[test]
fn test_dashboard_error_rate_scenario() {
    let engine = engine();
    let start = at_offset(minutes(0));

    // 150 requests within two minutes, the last 10 failing
    for i in 0..150u64 {
        let status = if i >= 140 { 500 } else { 200 };
        engine.record_at(
            outcome("GET", "/x", status, 20),
            start + Duration::from_millis(i * 500),
        );
    }

    let now = start + minutes(10);
    let dashboard = engine.dashboard(now);
    assert_eq!(dashboard.endpoint_stats.len(), 1);
    let stats = &dashboard.endpoint_stats[0];
    assert_eq!(stats.path, "/x");
    assert_eq!(stats.count, 150);
    assert_relative_eq!(stats.error_rate, 10.0 / 150.0 * 100.0, epsilon = 1e-9);

    let error_alerts: Vec<_> = dashboard
        .alerts
        .iter()
        .filter(|a| a.alert_type == AlertType::Error)
        .collect();
    assert_eq!(error_alerts.len(), 1);
    assert_eq!(error_alerts[0].severity, AlertSeverity::High);

    // Summary looks at the most recent 100 only
    assert_eq!(dashboard.summary.total_metrics, 150);
    assert_relative_eq!(dashboard.summary.error_rate, 10.0);
    assert_relative_eq!(dashboard.summary.avg_response_time, 20.0);
}

#[test]
fn test_trend_buckets_always_complete() {
    let engine = engine();
    let now = at_offset(minutes(120));
    assert_eq!(engine.dashboard(now).resource_trends.response_time.len(), 12);

    engine.record_at(outcome("GET", "/a", 200, 300), now - minutes(2));
    let trends = engine.dashboard(now).resource_trends;
    assert_eq!(trends.response_time.len(), 12);
    assert_eq!(trends.response_time.iter().filter(|p| p.value > 0.0).count(), 1);
    assert_relative_eq!(trends.response_time[11].value, 300.0);
    assert_relative_eq!(trends.memory_usage[11].value, 40.0);
}

#[test]
fn test_failed_probe_never_reaches_the_store() {
    let engine = TelemetryEngine::new(
        Thresholds::default(),
        Box::new(ScriptedProbe::failing()),
        None,
    )
    .unwrap();

    assert!(engine.begin("GET", "/a").finish(500, None).is_none());
    let store = engine.store();
    assert!(store.metrics().is_empty());
    assert!(store.windows().is_empty());
}

#[test]
fn test_malformed_thresholds_are_rejected() {
    let thresholds = Thresholds {
        error_rate_threshold: f64::NAN,
        ..Thresholds::default()
    };
    let result = TelemetryEngine::new(
        thresholds,
        Box::new(ScriptedProbe::new(quiet_sample())),
        None,
    );
    assert!(matches!(result, Err(TelemetryError::Config(_))));
}

#[test]
fn test_overflowing_windows_fail_at_startup() {
    for thresholds in [
        Thresholds {
            trend_bucket_minutes: u64::MAX / 60,
            ..Thresholds::default()
        },
        Thresholds {
            retention_hours: u64::MAX / 3600 + 1,
            ..Thresholds::default()
        },
    ] {
        let result = TelemetryEngine::new(
            thresholds,
            Box::new(ScriptedProbe::new(quiet_sample())),
            None,
        );
        assert!(matches!(result, Err(TelemetryError::Config(_))));
    }
}

#[test]
fn test_long_windows_within_limits_still_report() {
    let thresholds = Thresholds {
        retention_hours: 10 * 365 * 24,
        trend_bucket_minutes: 365 * 24 * 60,
        ..Thresholds::default()
    };
    let engine = TelemetryEngine::new(
        thresholds,
        Box::new(ScriptedProbe::new(quiet_sample())),
        None,
    )
    .unwrap();

    let now = at_offset(minutes(10));
    engine.record_at(outcome("GET", "/a", 200, 10), at_offset(minutes(1)));
    let dashboard = engine.dashboard(now);
    assert_eq!(dashboard.resource_trends.response_time.len(), 12);
    assert_eq!(dashboard.endpoint_stats[0].count, 1);
}

#[test]
fn test_concurrent_recording_keeps_counts_consistent() {
    let engine = Arc::new(engine());
    let now = at_offset(minutes(0));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                for i in 0..50 {
                    let status = if (t + i) % 4 == 0 { 500 } else { 200 };
                    engine.record_at(outcome("GET", "/c", status, 5), now);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let store = engine.store();
    assert_eq!(store.metrics().len(), 400);
    let state = store.windows().state("/c").unwrap();
    assert_eq!(state.total_count, 400);
    assert_eq!(state.error_count, 100);
    // One error alert per severity at most, all at the same instant
    let error_alerts = store
        .alerts()
        .iter()
        .filter(|a| a.alert_type == AlertType::Error)
        .count();
    assert!(error_alerts <= 2);
}
