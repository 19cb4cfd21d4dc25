//! Observability surface
//!
//! Prometheus counters for the pipeline and the HTTP server that exposes
//! the dashboard, the health verdict, alert resolution and `/metrics`.

pub mod metrics;
pub mod server;

pub use metrics::MetricsRegistry;
pub use server::{
    resolve_route, route_request, serve_listener, ApiResponse, Route, ServerConfig,
    TelemetryServer, USER_ID_HEADER,
};
