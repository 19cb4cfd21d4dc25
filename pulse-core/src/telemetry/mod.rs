//! In-process request telemetry and alerting
//!
//! Control flow for each completed request:
//! recorder -> error window -> metric store -> evaluator -> deduplicator
//! -> retention sweep, all inside one critical section. Logging and
//! persistence of admitted alerts happen after the lock is released.
//!
//! The dashboard and health views read the same stores under the same lock
//! and never mutate them.

pub mod dedup;
pub mod error_window;
pub mod evaluator;
pub mod probe;
pub mod recorder;
pub mod retention;
pub mod store;

pub use dedup::AlertDeduplicator;
pub use error_window::{ErrorRateWindow, ErrorWindowState};
pub use evaluator::{AlertEvaluator, AlertRule, ErrorRateRule, MemoryRule, ResponseTimeRule};
pub use probe::{ProcessProbe, ResourceProbe, ResourceSample};
pub use recorder::{InFlightRequest, RequestOutcome};
pub use retention::{RetentionSweeper, SweepStats};
pub use store::TelemetryStore;

use crate::config::Thresholds;
use crate::core::time::horizon;
use crate::core::{SystemAlert, TelemetryError};
use crate::monitoring::MetricsRegistry;
use crate::persistence::{PersistenceRecord, PersistenceWorker};
use crate::reporting::{
    AggregationReporter, Dashboard, HealthReport, HealthStatusComputer, MemoryReport,
};
use parking_lot::{Mutex, MutexGuard};
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};

/// The telemetry engine shared by every request handler
pub struct TelemetryEngine {
    thresholds: Thresholds,
    store: Mutex<TelemetryStore>,
    evaluator: AlertEvaluator,
    deduplicator: AlertDeduplicator,
    sweeper: RetentionSweeper,
    reporter: AggregationReporter,
    health: HealthStatusComputer,
    probe: Box<dyn ResourceProbe>,
    persistence: Option<PersistenceWorker>,
    metrics: MetricsRegistry,
    started: Instant,
}

impl TelemetryEngine {
    /// Build an engine; malformed thresholds are rejected here, at startup
    pub fn new(
        thresholds: Thresholds,
        probe: Box<dyn ResourceProbe>,
        persistence: Option<PersistenceWorker>,
    ) -> Result<Self, TelemetryError> {
        thresholds.validate()?;
        let metrics = MetricsRegistry::new()?;

        info!(
            response_time_threshold_ms = thresholds.response_time_threshold_ms,
            error_rate_threshold = thresholds.error_rate_threshold,
            memory_threshold = thresholds.memory_threshold,
            retention_hours = thresholds.retention_hours,
            cooldown_minutes = thresholds.cooldown_minutes,
            persistence = persistence.is_some(),
            "Telemetry engine initialized"
        );

        Ok(Self {
            store: Mutex::new(TelemetryStore::new(thresholds.error_window())),
            evaluator: AlertEvaluator::from_thresholds(&thresholds),
            deduplicator: AlertDeduplicator::new(thresholds.cooldown()),
            sweeper: RetentionSweeper::new(thresholds.retention()),
            reporter: AggregationReporter::new(&thresholds),
            health: HealthStatusComputer::new(thresholds.health_memory_limit),
            thresholds,
            probe,
            persistence,
            metrics,
            started: Instant::now(),
        })
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.started.elapsed()
    }

    /// Read-only access to the stores, for inspection and tests
    pub fn store(&self) -> MutexGuard<'_, TelemetryStore> {
        self.store.lock()
    }

    /// Clear all metrics, alerts and windows
    pub fn reset(&self) {
        self.store.lock().reset();
        self.metrics.metrics_retained.set(0);
        self.metrics.alerts_unresolved.set(0);
        info!("Telemetry store reset");
    }

    /// Mark an alert resolved.
    ///
    /// Resolving twice is not an error; only the first call is audited.
    pub fn resolve_alert(&self, id: &str, now: SystemTime) -> Result<SystemAlert, TelemetryError> {
        let (alert, first_resolution) = {
            let mut store = self.store.lock();
            let alert = store
                .find_alert_mut(id)
                .ok_or_else(|| TelemetryError::AlertNotFound { id: id.to_string() })?;
            let first_resolution = !alert.resolved;
            alert.resolved = true;
            let alert = alert.clone();
            self.metrics
                .alerts_unresolved
                .set(store.unresolved_alerts().count() as i64);
            (alert, first_resolution)
        };

        if first_resolution {
            self.metrics.alerts_resolved_total.inc();
            info!(
                alert_id = %alert.id,
                alert_type = alert.alert_type.as_str(),
                severity = alert.severity.as_str(),
                "Alert resolved"
            );
            self.persist(PersistenceRecord::AlertResolved {
                id: alert.id.clone(),
                alert_type: alert.alert_type,
                resolved_at: now,
            });
        } else {
            debug!(alert_id = %alert.id, "Alert already resolved");
        }

        Ok(alert)
    }

    /// Dashboard payload as of `now`
    pub fn dashboard(&self, now: SystemTime) -> Dashboard {
        let store = self.store.lock();
        self.reporter.build_dashboard(&store, now)
    }

    /// Health verdict as of `now` using a fresh memory reading
    pub fn health(&self, now: SystemTime) -> HealthReport {
        let memory = match self.probe.sample() {
            Ok(sample) => MemoryReport::from(sample),
            Err(e) => {
                warn!(error = %e, "Resource probe failed during health check");
                MemoryReport::default()
            }
        };

        let store = self.store.lock();
        let status = self
            .health
            .compute(store.unresolved_alerts(), memory.usage_fraction);
        let recent_cutoff = horizon(now, self.thresholds.health_recent_window());

        HealthReport {
            status,
            timestamp: now,
            uptime_secs: self.uptime().as_secs(),
            memory,
            active_alerts: store.unresolved_alerts().count(),
            recent_metrics: store
                .metrics()
                .iter()
                .filter(|m| m.timestamp >= recent_cutoff && m.timestamp <= now)
                .count(),
        }
    }

    /// Hand a record to the persistence worker without waiting
    fn persist(&self, record: PersistenceRecord) {
        let Some(worker) = &self.persistence else {
            return;
        };
        if worker.submit(record).is_err() {
            self.metrics.persistence_dropped_total.inc();
        }
    }
}
