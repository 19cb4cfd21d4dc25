//! Alert admission with a per `(type, severity)` cooldown
//!
//! The cooldown key deliberately ignores the endpoint: a burst of slow
//! responses across many routes collapses into one active alert.

use crate::core::time::{age, epoch_millis};
use crate::core::{AlertSeverity, AlertType, CandidateAlert, SystemAlert};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

pub struct AlertDeduplicator {
    cooldown: Duration,
    next_alert_seq: AtomicU64,
}

impl AlertDeduplicator {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            next_alert_seq: AtomicU64::new(1),
        }
    }

    /// True while an unresolved alert with the same key is inside its cooldown
    pub fn is_suppressed(
        &self,
        alerts: &[SystemAlert],
        alert_type: AlertType,
        severity: AlertSeverity,
        now: SystemTime,
    ) -> bool {
        alerts.iter().any(|existing| {
            !existing.resolved
                && existing.alert_type == alert_type
                && existing.severity == severity
                && age(now, existing.timestamp) < self.cooldown
        })
    }

    /// Append `candidate` to `alerts` unless suppressed.
    ///
    /// Returns the admitted alert; `None` means the candidate was dropped.
    pub fn admit(
        &self,
        alerts: &mut Vec<SystemAlert>,
        candidate: CandidateAlert,
        now: SystemTime,
    ) -> Option<SystemAlert> {
        if self.is_suppressed(alerts, candidate.alert_type(), candidate.severity, now) {
            return None;
        }

        let alert = SystemAlert::admit(self.next_id(now), candidate, now);
        alerts.push(alert.clone());
        Some(alert)
    }

    /// Time-derived id, unique within the process
    fn next_id(&self, now: SystemTime) -> String {
        let seq = self.next_alert_seq.fetch_add(1, Ordering::Relaxed);
        format!("alert_{}_{}", epoch_millis(now), seq)
    }
}
