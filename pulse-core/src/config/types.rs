use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Alerting thresholds and window sizes, immutable after startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Thresholds {
    /// Responses slower than this raise a performance alert
    pub response_time_threshold_ms: u64,
    /// Responses slower than this escalate to critical
    pub response_time_critical_ms: u64,

    /// Endpoint error ratio above this raises an error alert (0.0 to 1.0)
    pub error_rate_threshold: f64,
    /// Error ratio above this escalates to critical
    pub error_rate_critical: f64,

    /// Memory fraction above this raises a resource alert (0.0 to 1.0)
    pub memory_threshold: f64,
    /// Memory fraction above this escalates to critical
    pub memory_critical: f64,
    /// Memory fraction above this makes the system unhealthy
    pub health_memory_limit: f64,

    /// Metrics and resolved alerts older than this are evicted
    pub retention_hours: u64,
    /// Minimum spacing between admitted alerts of the same type and severity
    pub cooldown_minutes: u64,
    /// Length of the per-endpoint error counting window
    pub error_window_minutes: u64,

    /// Dashboard summary looks at this many most recent metrics
    pub recent_sample_size: usize,
    /// Dashboard endpoint stats look back this far
    pub endpoint_window_minutes: u64,
    /// Number of buckets in each resource trend series
    pub trend_buckets: usize,
    /// Width of one trend bucket
    pub trend_bucket_minutes: u64,
    /// Maximum unresolved alerts listed on the dashboard
    pub dashboard_alert_limit: usize,
    /// Health payload counts metrics from this far back
    pub health_recent_minutes: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            response_time_threshold_ms: 5_000,
            response_time_critical_ms: 10_000,
            error_rate_threshold: 0.05,
            error_rate_critical: 0.2,
            memory_threshold: 0.85,
            memory_critical: 0.95,
            health_memory_limit: 0.90,
            retention_hours: 24,
            cooldown_minutes: 15,
            error_window_minutes: 5,
            recent_sample_size: 100,
            endpoint_window_minutes: 60,
            trend_buckets: 12,
            trend_bucket_minutes: 5,
            dashboard_alert_limit: 20,
            health_recent_minutes: 5,
        }
    }
}

pub(crate) const MINUTE: u64 = 60;
pub(crate) const HOUR: u64 = 60 * MINUTE;
/// Longest window accepted for any duration setting
pub const MAX_WINDOW_SECS: u64 = 100 * 365 * 24 * HOUR;

impl Thresholds {
    pub fn retention(&self) -> Duration {
        span(self.retention_hours, HOUR)
    }

    pub fn cooldown(&self) -> Duration {
        span(self.cooldown_minutes, MINUTE)
    }

    pub fn error_window(&self) -> Duration {
        span(self.error_window_minutes, MINUTE)
    }

    pub fn endpoint_window(&self) -> Duration {
        span(self.endpoint_window_minutes, MINUTE)
    }

    pub fn trend_bucket(&self) -> Duration {
        span(self.trend_bucket_minutes, MINUTE)
    }

    /// Total span covered by the trend series
    pub fn trend_span(&self) -> Duration {
        let buckets = u32::try_from(self.trend_buckets).unwrap_or(u32::MAX);
        self.trend_bucket().saturating_mul(buckets)
    }

    pub fn health_recent_window(&self) -> Duration {
        span(self.health_recent_minutes, MINUTE)
    }

    /// Every configured window with its unit, as checked by `validate`
    pub(crate) fn windows(&self) -> [(&'static str, u64, u64); 6] {
        [
            ("retentionHours", self.retention_hours, HOUR),
            ("cooldownMinutes", self.cooldown_minutes, MINUTE),
            ("errorWindowMinutes", self.error_window_minutes, MINUTE),
            ("endpointWindowMinutes", self.endpoint_window_minutes, MINUTE),
            ("trendBucketMinutes", self.trend_bucket_minutes, MINUTE),
            ("healthRecentMinutes", self.health_recent_minutes, MINUTE),
        ]
    }
}

/// Saturates; out-of-range values never get past `validate`
fn span(count: u64, unit_secs: u64) -> Duration {
    Duration::from_secs(count.saturating_mul(unit_secs))
}
