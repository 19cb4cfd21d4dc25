//! Pull-based views over the telemetry stores
//!
//! - `dashboard`: summary, per-endpoint stats, resource trends, alert list
//! - `health`: three-level health verdict and the health payload

pub mod dashboard;
pub mod health;

pub use dashboard::{
    AggregationReporter, Dashboard, DashboardSummary, EndpointStats, ResourceTrends, TrendPoint,
};
pub use health::{HealthReport, HealthStatus, HealthStatusComputer, MemoryReport};
