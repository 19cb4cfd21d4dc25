//! Prometheus counters for the telemetry pipeline
//!
//! These mirror what the in-memory stores see so an external scraper can
//! follow request volume and alert churn without polling the dashboard.

use crate::core::{AlertSeverity, AlertType};
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use tracing::info;

const NAMESPACE: &str = "pulse";

/// Central registry for pipeline metrics
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Arc<Registry>,
    /// Requests observed by the recorder
    pub http_requests_total: IntCounterVec,
    /// Response time distribution in milliseconds
    pub http_response_time_ms: HistogramVec,
    /// Alerts admitted by the deduplicator
    pub alerts_admitted_total: IntCounterVec,
    /// Candidates dropped inside their cooldown
    pub alerts_suppressed_total: IntCounter,
    /// Alerts flipped to resolved
    pub alerts_resolved_total: IntCounter,
    /// Persistence records lost to a full or closed queue
    pub persistence_dropped_total: IntCounter,
    /// Requests whose metric was skipped because resources could not be read
    pub instrumentation_skipped_total: IntCounter,
    /// Metrics currently held in memory
    pub metrics_retained: IntGauge,
    /// Unresolved alerts currently held in memory
    pub alerts_unresolved: IntGauge,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Arc::new(Registry::new());

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests observed").namespace(NAMESPACE),
            &["method", "route", "status_class"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_response_time_ms = HistogramVec::new(
            HistogramOpts::new("http_response_time_ms", "HTTP response time in milliseconds")
                .namespace(NAMESPACE)
                .buckets(vec![
                    5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
                ]),
            &["method", "route"],
        )?;
        registry.register(Box::new(http_response_time_ms.clone()))?;

        let alerts_admitted_total = IntCounterVec::new(
            Opts::new("alerts_admitted_total", "Alerts admitted into the active set")
                .namespace(NAMESPACE),
            &["type", "severity"],
        )?;
        registry.register(Box::new(alerts_admitted_total.clone()))?;

        let alerts_suppressed_total = IntCounter::with_opts(
            Opts::new(
                "alerts_suppressed_total",
                "Candidate alerts dropped during cooldown",
            )
            .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(alerts_suppressed_total.clone()))?;

        let alerts_resolved_total = IntCounter::with_opts(
            Opts::new("alerts_resolved_total", "Alerts marked resolved").namespace(NAMESPACE),
        )?;
        registry.register(Box::new(alerts_resolved_total.clone()))?;

        let persistence_dropped_total = IntCounter::with_opts(
            Opts::new(
                "persistence_dropped_total",
                "Alert persistence records dropped before reaching storage",
            )
            .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(persistence_dropped_total.clone()))?;

        let instrumentation_skipped_total = IntCounter::with_opts(
            Opts::new(
                "instrumentation_skipped_total",
                "Requests not recorded because resource readings failed",
            )
            .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(instrumentation_skipped_total.clone()))?;

        let metrics_retained = IntGauge::with_opts(
            Opts::new("metrics_retained", "Performance metrics held in memory")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(metrics_retained.clone()))?;

        let alerts_unresolved = IntGauge::with_opts(
            Opts::new("alerts_unresolved", "Unresolved alerts held in memory")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(alerts_unresolved.clone()))?;

        info!("Prometheus metrics registry initialized");

        Ok(Self {
            registry,
            http_requests_total,
            http_response_time_ms,
            alerts_admitted_total,
            alerts_suppressed_total,
            alerts_resolved_total,
            persistence_dropped_total,
            instrumentation_skipped_total,
            metrics_retained,
            alerts_unresolved,
        })
    }

    /// Get the underlying Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn observe_request(&self, method: &str, route: &str, status_code: u16, response_time_ms: u64) {
        self.http_requests_total
            .with_label_values(&[method, route, status_class(status_code)])
            .inc();
        self.http_response_time_ms
            .with_label_values(&[method, route])
            .observe(response_time_ms as f64);
    }

    pub fn observe_admission(&self, alert_type: AlertType, severity: AlertSeverity) {
        self.alerts_admitted_total
            .with_label_values(&[alert_type.as_str(), severity.as_str()])
            .inc();
    }

    /// Encode all metrics in the text exposition format
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        use prometheus::{Encoder, TextEncoder};

        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn status_class(status_code: u16) -> &'static str {
    match status_code {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}
