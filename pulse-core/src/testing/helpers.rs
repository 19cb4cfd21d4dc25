use crate::core::time::from_epoch_millis;
use crate::core::{
    AlertMetadata, AlertSeverity, AlertType, ErrorRateSnapshot, MemorySnapshot,
    PerformanceMetric, ResponseTimeSnapshot, SystemAlert,
};
use crate::telemetry::{RequestOutcome, ResourceSample};
use std::time::{Duration, SystemTime};

/// Fixed reference instant used by test fixtures
pub const BASE_EPOCH_MILLIS: u64 = 1_700_000_000_000;

pub fn base_time() -> SystemTime {
    from_epoch_millis(BASE_EPOCH_MILLIS)
}

/// `base_time()` shifted forward
pub fn at_offset(offset: Duration) -> SystemTime {
    base_time() + offset
}

pub fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

/// Builder for captured metrics
pub struct MetricBuilder {
    metric: PerformanceMetric,
}

impl MetricBuilder {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            metric: PerformanceMetric {
                timestamp: base_time(),
                method: method.to_string(),
                path: path.to_string(),
                response_time_ms: 100,
                status_code: 200,
                user_id: None,
                error_rate_at_capture: 0.0,
                memory_usage_fraction: 0.5,
                cpu_seconds: 0.001,
            },
        }
    }

    pub fn at(mut self, timestamp: SystemTime) -> Self {
        self.metric.timestamp = timestamp;
        self
    }

    pub fn response_time(mut self, ms: u64) -> Self {
        self.metric.response_time_ms = ms;
        self
    }

    pub fn status(mut self, status_code: u16) -> Self {
        self.metric.status_code = status_code;
        self
    }

    pub fn error_rate(mut self, rate: f64) -> Self {
        self.metric.error_rate_at_capture = rate;
        self
    }

    pub fn memory(mut self, fraction: f64) -> Self {
        self.metric.memory_usage_fraction = fraction;
        self
    }

    pub fn user(mut self, user_id: &str) -> Self {
        self.metric.user_id = Some(user_id.to_string());
        self
    }

    pub fn build(self) -> PerformanceMetric {
        self.metric
    }
}

/// Builder for admitted alerts placed directly into a store
pub struct AlertBuilder {
    alert: SystemAlert,
}

impl AlertBuilder {
    pub fn new() -> Self {
        Self {
            alert: SystemAlert {
                id: "alert_test".to_string(),
                alert_type: AlertType::Performance,
                severity: AlertSeverity::High,
                message: "Slow response on GET /x".to_string(),
                timestamp: base_time(),
                resolved: false,
                metadata: metadata_for(AlertType::Performance),
            },
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.alert.id = id.to_string();
        self
    }

    pub fn kind(mut self, alert_type: AlertType) -> Self {
        self.alert.alert_type = alert_type;
        self.alert.metadata = metadata_for(alert_type);
        self
    }

    pub fn severity(mut self, severity: AlertSeverity) -> Self {
        self.alert.severity = severity;
        self
    }

    pub fn at(mut self, timestamp: SystemTime) -> Self {
        self.alert.timestamp = timestamp;
        self
    }

    pub fn resolved(mut self) -> Self {
        self.alert.resolved = true;
        self
    }

    pub fn build(self) -> SystemAlert {
        self.alert
    }
}

impl Default for AlertBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn metadata_for(alert_type: AlertType) -> AlertMetadata {
    match alert_type {
        AlertType::Performance => AlertMetadata::Performance(ResponseTimeSnapshot {
            method: "GET".to_string(),
            path: "/x".to_string(),
            response_time_ms: 6_000,
            status_code: 200,
            threshold_ms: 5_000,
        }),
        AlertType::Error => AlertMetadata::Error(ErrorRateSnapshot {
            method: "GET".to_string(),
            path: "/x".to_string(),
            error_rate: 0.1,
            threshold: 0.05,
        }),
        AlertType::Resource => AlertMetadata::Resource(MemorySnapshot {
            memory_usage_fraction: 0.9,
            threshold: 0.85,
            cpu_seconds: 0.0,
        }),
    }
}

/// Request outcome with quiet resource readings
pub fn outcome(method: &str, path: &str, status_code: u16, response_time_ms: u64) -> RequestOutcome {
    RequestOutcome {
        method: method.to_string(),
        path: path.to_string(),
        status_code,
        response_time_ms,
        user_id: None,
        resources: quiet_sample(),
        cpu_seconds: 0.001,
    }
}

/// 40% memory usage
pub fn quiet_sample() -> ResourceSample {
    ResourceSample::from_bytes(400, 1_000, 1.0)
}
