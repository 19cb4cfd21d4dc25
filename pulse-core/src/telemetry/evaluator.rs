//! Threshold rules applied to each captured metric
//!
//! Every rule is evaluated independently, so one metric yields zero to three
//! candidates. Rules only read the metric and their own thresholds.

use crate::config::Thresholds;
use crate::core::{
    AlertMetadata, AlertSeverity, AlertType, CandidateAlert, ErrorRateSnapshot, MemorySnapshot,
    PerformanceMetric, ResponseTimeSnapshot,
};
use tracing::debug;

/// Alert rule trait
pub trait AlertRule: Send + Sync {
    /// Rule name for identification
    fn name(&self) -> &str;

    /// Alert type produced by this rule
    fn alert_type(&self) -> AlertType;

    /// Evaluate rule against one metric
    fn evaluate(&self, metric: &PerformanceMetric) -> Option<CandidateAlert>;
}

/// `high` above the threshold, `critical` above the escalation point
fn escalate<T: PartialOrd>(value: T, critical: T) -> AlertSeverity {
    if value > critical {
        AlertSeverity::Critical
    } else {
        AlertSeverity::High
    }
}

/// Slow response rule
pub struct ResponseTimeRule {
    pub threshold_ms: u64,
    pub critical_ms: u64,
}

impl AlertRule for ResponseTimeRule {
    fn name(&self) -> &str {
        "slow_response"
    }

    fn alert_type(&self) -> AlertType {
        AlertType::Performance
    }

    fn evaluate(&self, metric: &PerformanceMetric) -> Option<CandidateAlert> {
        if metric.response_time_ms <= self.threshold_ms {
            return None;
        }

        Some(CandidateAlert {
            severity: escalate(metric.response_time_ms, self.critical_ms),
            message: format!(
                "Slow response on {} {}: {}ms (threshold {}ms)",
                metric.method, metric.path, metric.response_time_ms, self.threshold_ms
            ),
            metadata: AlertMetadata::Performance(ResponseTimeSnapshot {
                method: metric.method.clone(),
                path: metric.path.clone(),
                response_time_ms: metric.response_time_ms,
                status_code: metric.status_code,
                threshold_ms: self.threshold_ms,
            }),
        })
    }
}

/// Elevated endpoint error ratio rule
pub struct ErrorRateRule {
    pub threshold: f64,
    pub critical: f64,
}

impl AlertRule for ErrorRateRule {
    fn name(&self) -> &str {
        "high_error_rate"
    }

    fn alert_type(&self) -> AlertType {
        AlertType::Error
    }

    fn evaluate(&self, metric: &PerformanceMetric) -> Option<CandidateAlert> {
        let rate = metric.error_rate_at_capture;
        if rate <= self.threshold {
            return None;
        }

        Some(CandidateAlert {
            severity: escalate(rate, self.critical),
            message: format!(
                "High error rate on {} {}: {:.1}% (threshold {:.1}%)",
                metric.method,
                metric.path,
                rate * 100.0,
                self.threshold * 100.0
            ),
            metadata: AlertMetadata::Error(ErrorRateSnapshot {
                method: metric.method.clone(),
                path: metric.path.clone(),
                error_rate: rate,
                threshold: self.threshold,
            }),
        })
    }
}

/// Memory pressure rule
pub struct MemoryRule {
    pub threshold: f64,
    pub critical: f64,
}

impl AlertRule for MemoryRule {
    fn name(&self) -> &str {
        "memory_pressure"
    }

    fn alert_type(&self) -> AlertType {
        AlertType::Resource
    }

    fn evaluate(&self, metric: &PerformanceMetric) -> Option<CandidateAlert> {
        let usage = metric.memory_usage_fraction;
        if usage <= self.threshold {
            return None;
        }

        Some(CandidateAlert {
            severity: escalate(usage, self.critical),
            message: format!(
                "High memory usage: {:.1}% (threshold {:.1}%)",
                usage * 100.0,
                self.threshold * 100.0
            ),
            metadata: AlertMetadata::Resource(MemorySnapshot {
                memory_usage_fraction: usage,
                threshold: self.threshold,
                cpu_seconds: metric.cpu_seconds,
            }),
        })
    }
}

/// Evaluates every rule against a metric
pub struct AlertEvaluator {
    rules: Vec<Box<dyn AlertRule>>,
}

impl AlertEvaluator {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The three threshold rules configured from `thresholds`
    pub fn from_thresholds(thresholds: &Thresholds) -> Self {
        let mut evaluator = Self::new();
        evaluator.add_rule(Box::new(ResponseTimeRule {
            threshold_ms: thresholds.response_time_threshold_ms,
            critical_ms: thresholds.response_time_critical_ms,
        }));
        evaluator.add_rule(Box::new(ErrorRateRule {
            threshold: thresholds.error_rate_threshold,
            critical: thresholds.error_rate_critical,
        }));
        evaluator.add_rule(Box::new(MemoryRule {
            threshold: thresholds.memory_threshold,
            critical: thresholds.memory_critical,
        }));
        evaluator
    }

    pub fn add_rule(&mut self, rule: Box<dyn AlertRule>) {
        debug!(rule = rule.name(), "Adding alert rule");
        self.rules.push(rule);
    }

    pub fn evaluate(&self, metric: &PerformanceMetric) -> Vec<CandidateAlert> {
        self.rules
            .iter()
            .filter_map(|rule| rule.evaluate(metric))
            .collect()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::from_thresholds(&Thresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MetricBuilder;

    fn evaluator() -> AlertEvaluator {
        AlertEvaluator::default()
    }

    #[test]
    fn test_quiet_metric_yields_nothing() {
        let metric = MetricBuilder::new("GET", "/x").response_time(120).build();
        assert!(evaluator().evaluate(&metric).is_empty());
    }

    #[test]
    fn test_slow_response_is_high() {
        let metric = MetricBuilder::new("GET", "/x").response_time(6_000).build();
        let candidates = evaluator().evaluate(&metric);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].alert_type(), AlertType::Performance);
        assert_eq!(candidates[0].severity, AlertSeverity::High);
        match &candidates[0].metadata {
            AlertMetadata::Performance(snapshot) => {
                assert_eq!(snapshot.response_time_ms, 6_000);
                assert_eq!(snapshot.threshold_ms, 5_000);
            }
            other => panic!("Expected performance metadata, got {:?}", other),
        }
    }

    #[test]
    fn test_very_slow_response_is_critical() {
        let metric = MetricBuilder::new("GET", "/x").response_time(11_000).build();
        let candidates = evaluator().evaluate(&metric);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let metric = MetricBuilder::new("GET", "/x")
            .response_time(5_000)
            .error_rate(0.05)
            .memory(0.85)
            .build();
        assert!(evaluator().evaluate(&metric).is_empty());

        let metric = MetricBuilder::new("GET", "/x").response_time(10_000).build();
        assert_eq!(evaluator().evaluate(&metric)[0].severity, AlertSeverity::High);
    }

    #[test]
    fn test_error_rate_escalation() {
        let high = MetricBuilder::new("POST", "/x").error_rate(0.1).build();
        let critical = MetricBuilder::new("POST", "/x").error_rate(0.25).build();

        let candidates = evaluator().evaluate(&high);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].alert_type(), AlertType::Error);
        assert_eq!(candidates[0].severity, AlertSeverity::High);

        assert_eq!(evaluator().evaluate(&critical)[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_memory_escalation() {
        let high = MetricBuilder::new("GET", "/x").memory(0.9).build();
        let critical = MetricBuilder::new("GET", "/x").memory(0.96).build();

        let candidates = evaluator().evaluate(&high);
        assert_eq!(candidates[0].alert_type(), AlertType::Resource);
        assert_eq!(candidates[0].severity, AlertSeverity::High);
        assert_eq!(evaluator().evaluate(&critical)[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_all_rules_fire_independently() {
        let metric = MetricBuilder::new("GET", "/x")
            .response_time(12_000)
            .error_rate(0.1)
            .memory(0.9)
            .build();
        let candidates = evaluator().evaluate(&metric);

        let types: Vec<AlertType> = candidates.iter().map(|c| c.alert_type()).collect();
        assert_eq!(
            types,
            vec![AlertType::Performance, AlertType::Error, AlertType::Resource]
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = Thresholds {
            response_time_threshold_ms: 100,
            response_time_critical_ms: 200,
            ..Default::default()
        };
        let evaluator = AlertEvaluator::from_thresholds(&thresholds);
        assert_eq!(evaluator.rule_count(), 3);

        let metric = MetricBuilder::new("GET", "/x").response_time(250).build();
        assert_eq!(evaluator.evaluate(&metric)[0].severity, AlertSeverity::Critical);
    }
}
