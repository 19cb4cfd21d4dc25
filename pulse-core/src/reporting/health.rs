//! Health verdict
//!
//! Evaluated fresh on every call from the unresolved alerts and the current
//! memory reading. Nothing is remembered between calls.

use crate::core::time;
use crate::core::{AlertSeverity, SystemAlert};
use crate::telemetry::ResourceSample;
use serde::Serialize;
use std::time::SystemTime;

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// An unresolved high or critical alert exists
    Degraded,
    /// Memory over the limit or an unresolved critical alert exists
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }

    /// HTTP status code reported by the health endpoint
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Healthy => 200,
            Self::Degraded => 206,
            Self::Unhealthy => 503,
        }
    }
}

pub struct HealthStatusComputer {
    memory_limit: f64,
}

impl HealthStatusComputer {
    pub fn new(memory_limit: f64) -> Self {
        Self { memory_limit }
    }

    pub fn compute<'a, I>(&self, unresolved: I, memory_usage_fraction: f64) -> HealthStatus
    where
        I: IntoIterator<Item = &'a SystemAlert>,
    {
        let worst = unresolved
            .into_iter()
            .filter(|alert| !alert.resolved)
            .map(|alert| alert.severity)
            .max();

        if memory_usage_fraction > self.memory_limit || worst == Some(AlertSeverity::Critical) {
            HealthStatus::Unhealthy
        } else if worst == Some(AlertSeverity::High) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Memory section of the health payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryReport {
    pub usage_fraction: f64,
    pub resident_bytes: u64,
    pub total_bytes: u64,
}

impl From<ResourceSample> for MemoryReport {
    fn from(sample: ResourceSample) -> Self {
        Self {
            usage_fraction: sample.memory_usage_fraction,
            resident_bytes: sample.resident_bytes,
            total_bytes: sample.total_bytes,
        }
    }
}

/// Health endpoint payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(with = "time::millis")]
    pub timestamp: SystemTime,
    #[serde(rename = "uptime")]
    pub uptime_secs: u64,
    pub memory: MemoryReport,
    pub active_alerts: usize,
    pub recent_metrics: usize,
}
