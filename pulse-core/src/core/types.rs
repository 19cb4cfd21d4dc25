//! Metric and alert types
//!
//! A `PerformanceMetric` is captured once per completed request and never
//! mutated. A `SystemAlert` is created only by the deduplicator; flipping
//! `resolved` is the only mutation allowed afterwards.

use super::time;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// One completed HTTP request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    #[serde(with = "time::millis")]
    pub timestamp: SystemTime,
    pub method: String,
    /// Route template, never the raw URL
    pub path: String,
    pub response_time_ms: u64,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Error ratio of `path` including this request (0.0 to 1.0)
    pub error_rate_at_capture: f64,
    /// Resident memory over total memory at completion (0.0 to 1.0)
    pub memory_usage_fraction: f64,
    /// Process CPU time spent while serving the request
    pub cpu_seconds: f64,
}

impl PerformanceMetric {
    /// 4xx and 5xx responses count as errors
    pub fn is_error(&self) -> bool {
        is_error_status(self.status_code)
    }
}

pub fn is_error_status(status_code: u16) -> bool {
    status_code >= 400
}

/// Alert type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    /// Slow responses
    Performance,
    /// Elevated error ratio on an endpoint
    Error,
    /// Memory pressure
    Resource,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::Error => "error",
            Self::Resource => "resource",
        }
    }
}

/// Alert severity levels, totally ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Snapshot carried by a performance alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTimeSnapshot {
    pub method: String,
    pub path: String,
    pub response_time_ms: u64,
    pub status_code: u16,
    pub threshold_ms: u64,
}

/// Snapshot carried by an error-rate alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRateSnapshot {
    pub method: String,
    pub path: String,
    pub error_rate: f64,
    pub threshold: f64,
}

/// Snapshot carried by a resource alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub memory_usage_fraction: f64,
    pub threshold: f64,
    pub cpu_seconds: f64,
}

/// Alert metadata, one variant per alert type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AlertMetadata {
    Performance(ResponseTimeSnapshot),
    Error(ErrorRateSnapshot),
    Resource(MemorySnapshot),
}

impl AlertMetadata {
    pub fn alert_type(&self) -> AlertType {
        match self {
            Self::Performance(_) => AlertType::Performance,
            Self::Error(_) => AlertType::Error,
            Self::Resource(_) => AlertType::Resource,
        }
    }
}

/// Alert proposed by the evaluator, not yet admitted
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateAlert {
    pub severity: AlertSeverity,
    pub message: String,
    pub metadata: AlertMetadata,
}

impl CandidateAlert {
    pub fn alert_type(&self) -> AlertType {
        self.metadata.alert_type()
    }
}

/// Admitted alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(with = "time::millis")]
    pub timestamp: SystemTime,
    pub resolved: bool,
    pub metadata: AlertMetadata,
}

impl SystemAlert {
    pub(crate) fn admit(id: String, candidate: CandidateAlert, timestamp: SystemTime) -> Self {
        Self {
            id,
            alert_type: candidate.alert_type(),
            severity: candidate.severity,
            message: candidate.message,
            timestamp,
            resolved: false,
            metadata: candidate.metadata,
        }
    }

    /// Format alert for display
    pub fn format(&self) -> String {
        format!(
            "[{}] {}.{} - {}",
            self.severity.as_str().to_uppercase(),
            self.alert_type.as_str(),
            self.id,
            self.message
        )
    }
}
