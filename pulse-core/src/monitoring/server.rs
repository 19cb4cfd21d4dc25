//! HTTP boundary for the telemetry engine
//!
//! Serves the dashboard, the health verdict, alert resolution and the
//! Prometheus text export. Every request served here is itself recorded by
//! the engine under its route template.

use crate::core::TelemetryError;
use crate::persistence::DEFAULT_QUEUE_CAPACITY;
use crate::telemetry::TelemetryEngine;
use anyhow::{Context, Result};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

const JSON: &str = "application/json";
const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4";

/// Header carrying the caller's user id, if any
pub const USER_ID_HEADER: &str = "x-user-id";

/// Server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "0.0.0.0:8080")
    pub listen_addr: SocketAddr,
    /// Where critical alerts and resolutions are journaled; `None` disables it
    pub journal_path: Option<PathBuf>,
    pub persistence_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            journal_path: None,
            persistence_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Known routes, resolved from the raw request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Health,
    ResolveAlert(String),
    Metrics,
    Unmatched,
}

impl Route {
    /// Template recorded as the metric path; bounded cardinality
    pub fn template(&self) -> &'static str {
        match self {
            Self::Dashboard => "/api/monitoring/dashboard",
            Self::Health => "/health",
            Self::ResolveAlert(_) => "/api/monitoring/alerts/{id}/resolve",
            Self::Metrics => "/metrics",
            Self::Unmatched => "unmatched",
        }
    }

    fn allowed_method(&self) -> Option<Method> {
        match self {
            Self::Dashboard | Self::Health | Self::Metrics => Some(Method::GET),
            Self::ResolveAlert(_) => Some(Method::PATCH),
            Self::Unmatched => None,
        }
    }
}

pub fn resolve_route(path: &str) -> Route {
    match path {
        "/api/monitoring/dashboard" => return Route::Dashboard,
        "/health" => return Route::Health,
        "/metrics" => return Route::Metrics,
        _ => {}
    }

    path.strip_prefix("/api/monitoring/alerts/")
        .and_then(|rest| rest.strip_suffix("/resolve"))
        .filter(|id| !id.is_empty() && !id.contains('/'))
        .map(|id| Route::ResolveAlert(id.to_string()))
        .unwrap_or(Route::Unmatched)
}

/// A response before it is turned into a hyper type
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl ApiResponse {
    fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: JSON,
                body: Bytes::from(body),
            },
            Err(e) => {
                error!(error = %e, "Failed to serialize response body");
                Self::error(StatusCode::INTERNAL_SERVER_ERROR, "serialization failed")
            }
        }
    }

    fn error(status: StatusCode, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self {
            status,
            content_type: JSON,
            body: Bytes::from(body),
        }
    }

    fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        response
    }
}

/// Answer one request against the engine as of `now`
pub fn route_request(
    engine: &TelemetryEngine,
    method: &Method,
    route: &Route,
    now: SystemTime,
) -> ApiResponse {
    match route.allowed_method() {
        None => return ApiResponse::error(StatusCode::NOT_FOUND, "not found"),
        Some(allowed) if allowed != *method => {
            return ApiResponse::error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        }
        Some(_) => {}
    }

    match route {
        Route::Dashboard => ApiResponse::json(StatusCode::OK, &engine.dashboard(now)),
        Route::Health => {
            let report = engine.health(now);
            let status = StatusCode::from_u16(report.status.http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            ApiResponse::json(status, &report)
        }
        Route::ResolveAlert(id) => match engine.resolve_alert(id, now) {
            Ok(alert) => ApiResponse::json(StatusCode::OK, &alert),
            Err(e @ TelemetryError::AlertNotFound { .. }) => {
                ApiResponse::error(StatusCode::NOT_FOUND, &e.to_string())
            }
            Err(e) => {
                error!(error = %e, alert_id = %id, "Failed to resolve alert");
                ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        },
        Route::Metrics => match engine.metrics().encode_text() {
            Ok(text) => ApiResponse {
                status: StatusCode::OK,
                content_type: PROMETHEUS_TEXT,
                body: Bytes::from(text),
            },
            Err(e) => {
                error!(error = %e, "Failed to encode metrics");
                ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable")
            }
        },
        Route::Unmatched => ApiResponse::error(StatusCode::NOT_FOUND, "not found"),
    }
}

/// HTTP server around a shared engine
pub struct TelemetryServer {
    listen_addr: SocketAddr,
    engine: Arc<TelemetryEngine>,
}

impl TelemetryServer {
    pub fn new(listen_addr: SocketAddr, engine: Arc<TelemetryEngine>) -> Self {
        Self {
            listen_addr,
            engine,
        }
    }

    /// Bind and serve until `shutdown` is notified
    pub async fn serve(self, shutdown: Arc<Notify>) -> Result<()> {
        let listener = TcpListener::bind(&self.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.listen_addr))?;
        serve_listener(listener, self.engine, shutdown).await
    }
}

/// Serve on an already bound listener until `shutdown` is notified.
///
/// Connections accepted before shutdown finish on their own tasks.
pub async fn serve_listener(
    listener: TcpListener,
    engine: Arc<TelemetryEngine>,
    shutdown: Arc<Notify>,
) -> Result<()> {
    let local_addr = listener
        .local_addr()
        .context("Failed to read listener address")?;
    info!(addr = %local_addr, "Telemetry server listening");

    loop {
        let (stream, remote_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    continue;
                }
            },
            _ = shutdown.notified() => {
                info!("Telemetry server shutting down");
                return Ok(());
            }
        };

        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let engine = Arc::clone(&engine);
                async move { handle_request(req, engine) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!(remote = %remote_addr, error = %err, "Connection error");
            }
        });
    }
}

fn handle_request<B>(
    req: Request<B>,
    engine: Arc<TelemetryEngine>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let route = resolve_route(req.uri().path());
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let in_flight = engine.begin(method.as_str(), route.template());
    let reply = route_request(&engine, &method, &route, SystemTime::now());
    in_flight.finish(reply.status.as_u16(), user_id);

    if reply.status == StatusCode::NOT_FOUND && route == Route::Unmatched {
        warn!(method = %method, path = %req.uri().path(), "Unknown endpoint requested");
    }

    Ok(reply.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::testing::{at_offset, minutes, outcome, quiet_sample, ScriptedProbe};
    use crate::telemetry::ResourceSample;

    fn engine_with(sample: ResourceSample) -> TelemetryEngine {
        TelemetryEngine::new(
            Thresholds::default(),
            Box::new(ScriptedProbe::new(sample)),
            None,
        )
        .unwrap()
    }

    fn json(reply: &ApiResponse) -> serde_json::Value {
        serde_json::from_slice(&reply.body).unwrap()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr.port(), 8080);
        assert!(config.journal_path.is_none());
        assert_eq!(config.persistence_queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_resolve_route() {
        assert_eq!(resolve_route("/api/monitoring/dashboard"), Route::Dashboard);
        assert_eq!(resolve_route("/health"), Route::Health);
        assert_eq!(resolve_route("/metrics"), Route::Metrics);
        assert_eq!(
            resolve_route("/api/monitoring/alerts/alert_1_0/resolve"),
            Route::ResolveAlert("alert_1_0".to_string())
        );
        assert_eq!(resolve_route("/api/monitoring/alerts//resolve"), Route::Unmatched);
        assert_eq!(resolve_route("/api/monitoring/alerts/a/b/resolve"), Route::Unmatched);
        assert_eq!(resolve_route("/nope"), Route::Unmatched);
        assert_eq!(
            Route::ResolveAlert("x".to_string()).template(),
            "/api/monitoring/alerts/{id}/resolve"
        );
    }

    #[test]
    fn test_health_status_codes() {
        let engine = engine_with(quiet_sample());
        let now = at_offset(minutes(1));
        let reply = route_request(&engine, &Method::GET, &Route::Health, now);
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(json(&reply)["status"], "healthy");

        // Critical response time alert makes the service unhealthy
        engine.record_at(outcome("GET", "/slow", 200, 12_000), now);
        let reply = route_request(&engine, &Method::GET, &Route::Health, now);
        assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json(&reply)["activeAlerts"], 1);
        assert_eq!(json(&reply)["recentMetrics"], 1);
    }

    #[test]
    fn test_health_degraded_is_partial_content() {
        let engine = engine_with(quiet_sample());
        let now = at_offset(minutes(1));
        engine.record_at(outcome("GET", "/slow", 200, 6_000), now);
        let reply = route_request(&engine, &Method::GET, &Route::Health, now);
        assert_eq!(reply.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(json(&reply)["status"], "degraded");
    }

    #[test]
    fn test_resolve_endpoint() {
        let engine = engine_with(quiet_sample());
        let now = at_offset(minutes(1));
        engine.record_at(outcome("GET", "/slow", 200, 6_000), now);
        let id = engine.store().alerts()[0].id.clone();

        let route = Route::ResolveAlert(id.clone());
        let reply = route_request(&engine, &Method::PATCH, &route, now);
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(json(&reply)["id"], id.as_str());
        assert_eq!(json(&reply)["resolved"], true);

        let missing = Route::ResolveAlert("missing".to_string());
        let reply = route_request(&engine, &Method::PATCH, &missing, now);
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert!(json(&reply)["error"].as_str().unwrap().contains("missing"));
    }

    #[test]
    fn test_wrong_method_and_unknown_path() {
        let engine = engine_with(quiet_sample());
        let now = at_offset(minutes(1));

        let reply = route_request(&engine, &Method::POST, &Route::Dashboard, now);
        assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);

        let reply = route_request(&engine, &Method::GET, &Route::Unmatched, now);
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_metrics_endpoint_is_text() {
        let engine = engine_with(quiet_sample());
        engine.record_at(outcome("GET", "/x", 200, 5), at_offset(minutes(1)));
        let reply = route_request(&engine, &Method::GET, &Route::Metrics, at_offset(minutes(1)));
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.content_type, PROMETHEUS_TEXT);
        assert!(String::from_utf8_lossy(&reply.body).contains("pulse_http_requests_total"));
    }

    #[test]
    fn test_handler_records_itself() {
        let engine = Arc::new(engine_with(quiet_sample()));
        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/monitoring/dashboard")
            .header(USER_ID_HEADER, "user-1")
            .body(())
            .unwrap();

        let response = handle_request(req, Arc::clone(&engine)).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], JSON);

        let store = engine.store();
        assert_eq!(store.metrics().len(), 1);
        assert_eq!(store.metrics()[0].path, "/api/monitoring/dashboard");
        assert_eq!(store.metrics()[0].user_id.as_deref(), Some("user-1"));
    }

    #[test]
    fn test_unknown_paths_share_one_template() {
        let engine = Arc::new(engine_with(quiet_sample()));
        for path in ["/a", "/b/c"] {
            let req = Request::builder().uri(path).body(()).unwrap();
            let response = handle_request(req, Arc::clone(&engine)).unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        let store = engine.store();
        assert_eq!(store.metrics().len(), 2);
        assert!(store.metrics().iter().all(|m| m.path == "unmatched"));
    }
}
