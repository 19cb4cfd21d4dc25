//! Age-based eviction of metrics and resolved alerts
//!
//! Unresolved alerts are never evicted by age.

use super::store::TelemetryStore;
use crate::core::time::horizon;
use std::time::{Duration, SystemTime};

/// Counts of what one sweep removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub metrics_evicted: usize,
    pub alerts_evicted: usize,
}

impl SweepStats {
    pub fn is_empty(&self) -> bool {
        self.metrics_evicted == 0 && self.alerts_evicted == 0
    }
}

pub struct RetentionSweeper {
    retention: Duration,
}

impl RetentionSweeper {
    pub fn new(retention: Duration) -> Self {
        Self { retention }
    }

    /// Remove everything older than the retention horizon. Idempotent.
    pub fn sweep(&self, store: &mut TelemetryStore, now: SystemTime) -> SweepStats {
        let cutoff = horizon(now, self.retention);

        let metrics_before = store.metrics.len();
        store.metrics.retain(|metric| metric.timestamp >= cutoff);

        let alerts_before = store.alerts.len();
        store
            .alerts
            .retain(|alert| !alert.resolved || alert.timestamp >= cutoff);

        SweepStats {
            metrics_evicted: metrics_before - store.metrics.len(),
            alerts_evicted: alerts_before - store.alerts.len(),
        }
    }
}
