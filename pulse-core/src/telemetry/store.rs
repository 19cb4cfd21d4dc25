//! In-memory metric and alert stores
//!
//! One `TelemetryStore` is owned by the engine behind a single mutex. Tests
//! construct their own and call `reset()` instead of relying on globals.

use super::error_window::ErrorRateWindow;
use crate::core::{PerformanceMetric, SystemAlert};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TelemetryStore {
    /// Append-only, in completion order
    pub(crate) metrics: Vec<PerformanceMetric>,
    /// Admitted alerts, resolved ones included until they age out
    pub(crate) alerts: Vec<SystemAlert>,
    pub(crate) windows: ErrorRateWindow,
}

impl TelemetryStore {
    pub fn new(error_window: Duration) -> Self {
        Self {
            metrics: Vec::new(),
            alerts: Vec::new(),
            windows: ErrorRateWindow::new(error_window),
        }
    }

    /// Drop all metrics, alerts and windows
    pub fn reset(&mut self) {
        self.metrics.clear();
        self.alerts.clear();
        self.windows.clear();
    }

    pub fn metrics(&self) -> &[PerformanceMetric] {
        &self.metrics
    }

    pub fn alerts(&self) -> &[SystemAlert] {
        &self.alerts
    }

    pub fn windows(&self) -> &ErrorRateWindow {
        &self.windows
    }

    pub fn unresolved_alerts(&self) -> impl Iterator<Item = &SystemAlert> {
        self.alerts.iter().filter(|alert| !alert.resolved)
    }

    pub fn find_alert_mut(&mut self, id: &str) -> Option<&mut SystemAlert> {
        self.alerts.iter_mut().find(|alert| alert.id == id)
    }

    /// Push a metric directly, bypassing the recorder
    pub fn push_metric(&mut self, metric: PerformanceMetric) {
        self.metrics.push(metric);
    }

    /// Push an alert directly, bypassing the deduplicator
    pub fn push_alert(&mut self, alert: SystemAlert) {
        self.alerts.push(alert);
    }
}
