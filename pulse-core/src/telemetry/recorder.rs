//! Request instrumentation
//!
//! Nothing here returns an error to the request path. A failed resource
//! reading skips the metric for that request and is only logged.

use super::probe::ResourceSample;
use super::TelemetryEngine;
use crate::core::types::is_error_status;
use crate::core::{AlertSeverity, PerformanceMetric, SystemAlert};
use crate::persistence::PersistenceRecord;
use std::time::{Instant, SystemTime};
use tracing::{debug, error, warn};

/// Everything known about a request once its response is complete
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub method: String,
    /// Resolved route template
    pub path: String,
    pub status_code: u16,
    pub response_time_ms: u64,
    pub user_id: Option<String>,
    /// Resource reading taken at completion
    pub resources: ResourceSample,
    /// CPU time consumed between start and completion
    pub cpu_seconds: f64,
}

/// A request being timed; created by [`TelemetryEngine::begin`]
#[must_use = "an in-flight request records nothing until finished"]
pub struct InFlightRequest<'a> {
    engine: &'a TelemetryEngine,
    method: String,
    path: String,
    started: Instant,
    /// `None` when the start reading failed
    cpu_at_start: Option<f64>,
}

impl<'a> InFlightRequest<'a> {
    /// Complete the request and run the telemetry pipeline
    pub fn finish(self, status_code: u16, user_id: Option<String>) -> Option<PerformanceMetric> {
        let response_time_ms = self.started.elapsed().as_millis() as u64;

        let resources = match self.engine.probe.sample() {
            Ok(sample) => sample,
            Err(e) => {
                self.engine.metrics.instrumentation_skipped_total.inc();
                warn!(
                    error = %e,
                    method = %self.method,
                    path = %self.path,
                    "Skipping request metric, resource reading failed"
                );
                return None;
            }
        };

        let cpu_seconds = self
            .cpu_at_start
            .map_or(0.0, |start| (resources.cpu_seconds - start).max(0.0));

        let outcome = RequestOutcome {
            method: self.method,
            path: self.path,
            status_code,
            response_time_ms,
            user_id,
            resources,
            cpu_seconds,
        };
        Some(self.engine.record_at(outcome, SystemTime::now()))
    }
}

impl TelemetryEngine {
    /// Start timing a request against a route template
    pub fn begin(&self, method: &str, route: &str) -> InFlightRequest<'_> {
        let cpu_at_start = self.probe.sample().ok().map(|s| s.cpu_seconds);
        InFlightRequest {
            engine: self,
            method: method.to_string(),
            path: route.to_string(),
            started: Instant::now(),
            cpu_at_start,
        }
    }

    /// Run the pipeline for one completed request as of `now`.
    ///
    /// The window update, metric append, alert admission and retention sweep
    /// happen under one lock; logging and persistence follow after it.
    pub fn record_at(&self, outcome: RequestOutcome, now: SystemTime) -> PerformanceMetric {
        let is_error = is_error_status(outcome.status_code);

        let (metric, admitted, suppressed, swept) = {
            let mut store = self.store.lock();

            store.windows.record_outcome(&outcome.path, is_error, now);
            let error_rate_at_capture = store.windows.current_ratio(&outcome.path);

            let metric = PerformanceMetric {
                timestamp: now,
                method: outcome.method,
                path: outcome.path,
                response_time_ms: outcome.response_time_ms,
                status_code: outcome.status_code,
                user_id: outcome.user_id,
                error_rate_at_capture,
                memory_usage_fraction: outcome.resources.memory_usage_fraction,
                cpu_seconds: outcome.cpu_seconds,
            };
            store.metrics.push(metric.clone());

            let mut admitted = Vec::new();
            let mut suppressed = 0u64;
            for candidate in self.evaluator.evaluate(&metric) {
                match self.deduplicator.admit(&mut store.alerts, candidate, now) {
                    Some(alert) => admitted.push(alert),
                    None => suppressed += 1,
                }
            }

            let swept = self.sweeper.sweep(&mut store, now);

            self.metrics.metrics_retained.set(store.metrics.len() as i64);
            self.metrics
                .alerts_unresolved
                .set(store.unresolved_alerts().count() as i64);

            (metric, admitted, suppressed, swept)
        };

        self.metrics.observe_request(
            &metric.method,
            &metric.path,
            metric.status_code,
            metric.response_time_ms,
        );
        if suppressed > 0 {
            self.metrics.alerts_suppressed_total.inc_by(suppressed);
            debug!(
                suppressed,
                path = %metric.path,
                "Candidate alerts suppressed by cooldown"
            );
        }
        if !swept.is_empty() {
            debug!(
                metrics_evicted = swept.metrics_evicted,
                alerts_evicted = swept.alerts_evicted,
                "Retention sweep evicted entries"
            );
        }

        for alert in admitted {
            self.on_admitted(alert);
        }

        metric
    }

    /// Convenience wrapper for [`Self::record_at`] with the wall clock
    pub fn record(&self, outcome: RequestOutcome) -> PerformanceMetric {
        self.record_at(outcome, SystemTime::now())
    }

    fn on_admitted(&self, alert: SystemAlert) {
        self.metrics
            .observe_admission(alert.alert_type, alert.severity);

        if alert.severity == AlertSeverity::Critical {
            error!(
                alert_id = %alert.id,
                alert_type = alert.alert_type.as_str(),
                severity = alert.severity.as_str(),
                message = %alert.message,
                "Alert admitted"
            );
            self.persist(PersistenceRecord::CriticalAlertCreated(alert));
        } else {
            warn!(
                alert_id = %alert.id,
                alert_type = alert.alert_type.as_str(),
                severity = alert.severity.as_str(),
                message = %alert.message,
                "Alert admitted"
            );
        }
    }
}
