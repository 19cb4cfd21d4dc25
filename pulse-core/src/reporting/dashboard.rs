//! Dashboard aggregation
//!
//! Every figure is derived from the stores at call time; nothing is cached
//! and the stores are only read.

use crate::config::Thresholds;
use crate::core::time::{epoch_millis, horizon};
use crate::core::{PerformanceMetric, SystemAlert};
use crate::telemetry::TelemetryStore;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// Dashboard payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub summary: DashboardSummary,
    pub endpoint_stats: Vec<EndpointStats>,
    pub resource_trends: ResourceTrends,
    /// Most recent unresolved alerts, newest first
    pub alerts: Vec<SystemAlert>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_metrics: usize,
    /// Mean over the most recent sample, milliseconds
    pub avg_response_time: f64,
    /// Percentage of the most recent sample with status >= 400
    pub error_rate: f64,
    pub active_alerts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStats {
    pub method: String,
    pub path: String,
    pub count: usize,
    pub avg_response_time: f64,
    /// Percentage (0 to 100)
    pub error_rate: f64,
}

/// One bucket of a trend series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Bucket start, epoch milliseconds
    pub timestamp: u64,
    pub value: f64,
}

/// Fixed-length series, oldest bucket first
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTrends {
    /// Mean response time in milliseconds
    pub response_time: Vec<TrendPoint>,
    /// Mean memory usage percentage
    pub memory_usage: Vec<TrendPoint>,
    /// Requests per minute
    pub request_rate: Vec<TrendPoint>,
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    errors: usize,
    response_time_ms: u64,
    memory_fraction: f64,
}

impl Accumulator {
    fn add(&mut self, metric: &PerformanceMetric) {
        self.count += 1;
        if metric.is_error() {
            self.errors += 1;
        }
        self.response_time_ms += metric.response_time_ms;
        self.memory_fraction += metric.memory_usage_fraction;
    }

    fn avg_response_time(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.response_time_ms as f64 / self.count as f64
        }
    }

    fn error_percentage(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.errors as f64 / self.count as f64 * 100.0
        }
    }

    fn avg_memory_percentage(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.memory_fraction / self.count as f64 * 100.0
        }
    }
}

/// Builds dashboard payloads from a store
pub struct AggregationReporter {
    recent_sample_size: usize,
    endpoint_window: Duration,
    trend_buckets: usize,
    trend_bucket: Duration,
    trend_span: Duration,
    alert_limit: usize,
}

impl AggregationReporter {
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            recent_sample_size: thresholds.recent_sample_size,
            endpoint_window: thresholds.endpoint_window(),
            trend_buckets: thresholds.trend_buckets,
            trend_bucket: thresholds.trend_bucket(),
            trend_span: thresholds.trend_span(),
            alert_limit: thresholds.dashboard_alert_limit,
        }
    }

    pub fn build_dashboard(&self, store: &TelemetryStore, now: SystemTime) -> Dashboard {
        Dashboard {
            summary: self.summary(store),
            endpoint_stats: self.endpoint_stats(store.metrics(), now),
            resource_trends: self.resource_trends(store.metrics(), now),
            alerts: self.recent_alerts(store),
        }
    }

    pub fn summary(&self, store: &TelemetryStore) -> DashboardSummary {
        let metrics = store.metrics();
        let recent = &metrics[metrics.len().saturating_sub(self.recent_sample_size)..];

        let mut acc = Accumulator::default();
        recent.iter().for_each(|m| acc.add(m));

        DashboardSummary {
            total_metrics: metrics.len(),
            avg_response_time: acc.avg_response_time(),
            error_rate: acc.error_percentage(),
            active_alerts: store.unresolved_alerts().count(),
        }
    }

    /// Stats per `(method, path)` over `[now - window, now)`, busiest first
    pub fn endpoint_stats(&self, metrics: &[PerformanceMetric], now: SystemTime) -> Vec<EndpointStats> {
        let cutoff = horizon(now, self.endpoint_window);

        let mut groups: HashMap<(&str, &str), Accumulator> = HashMap::new();
        for metric in metrics
            .iter()
            .filter(|m| m.timestamp >= cutoff && m.timestamp < now)
        {
            groups
                .entry((metric.method.as_str(), metric.path.as_str()))
                .or_default()
                .add(metric);
        }

        let mut stats: Vec<EndpointStats> = groups
            .into_iter()
            .map(|((method, path), acc)| EndpointStats {
                method: method.to_string(),
                path: path.to_string(),
                count: acc.count,
                avg_response_time: acc.avg_response_time(),
                error_rate: acc.error_percentage(),
            })
            .collect();

        stats.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.method.cmp(&b.method))
                .then_with(|| a.path.cmp(&b.path))
        });
        stats
    }

    /// Bucket `i` covers `[start + i*width, start + (i+1)*width)` where
    /// `start = now - buckets*width`. Empty buckets report 0.
    pub fn resource_trends(&self, metrics: &[PerformanceMetric], now: SystemTime) -> ResourceTrends {
        let start = horizon(now, self.trend_span);
        let width_ms = self.trend_bucket.as_millis().max(1);

        let mut buckets: Vec<Accumulator> = (0..self.trend_buckets)
            .map(|_| Accumulator::default())
            .collect();

        for metric in metrics {
            if metric.timestamp < start || metric.timestamp >= now {
                continue;
            }
            let offset_ms = metric
                .timestamp
                .duration_since(start)
                .unwrap_or(Duration::ZERO)
                .as_millis();
            let index = ((offset_ms / width_ms) as usize).min(self.trend_buckets - 1);
            buckets[index].add(metric);
        }

        let bucket_minutes = self.trend_bucket.as_secs_f64() / 60.0;
        let point = |i: usize, value: f64| TrendPoint {
            timestamp: start
                .checked_add(self.trend_bucket.saturating_mul(i as u32))
                .map_or(u64::MAX, epoch_millis),
            value,
        };

        ResourceTrends {
            response_time: buckets
                .iter()
                .enumerate()
                .map(|(i, acc)| point(i, acc.avg_response_time()))
                .collect(),
            memory_usage: buckets
                .iter()
                .enumerate()
                .map(|(i, acc)| point(i, acc.avg_memory_percentage()))
                .collect(),
            request_rate: buckets
                .iter()
                .enumerate()
                .map(|(i, acc)| point(i, acc.count as f64 / bucket_minutes))
                .collect(),
        }
    }

    /// Newest unresolved alerts, capped at the configured limit
    pub fn recent_alerts(&self, store: &TelemetryStore) -> Vec<SystemAlert> {
        let mut alerts: Vec<SystemAlert> = store.unresolved_alerts().cloned().collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts.truncate(self.alert_limit);
        alerts
    }
}
