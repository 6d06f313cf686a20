//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Relay outcomes and latency
//! - Ledger RPC calls
//! - Node health

use crate::error::{RelayerError, RelayerResult};
use crate::relay::RelayFailure;

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram,
    register_histogram_vec, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramVec,
    TextEncoder,
};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

lazy_static! {
    // Relay metrics
    pub static ref RELAYS_STARTED: Counter = register_counter!(
        "betvex_relays_started_total",
        "Total relay requests accepted"
    ).unwrap();

    pub static ref RELAYS_SUCCEEDED: Counter = register_counter!(
        "betvex_relays_succeeded_total",
        "Total bets placed with every receipt successful"
    ).unwrap();

    pub static ref RELAYS_FAILED: CounterVec = register_counter_vec!(
        "betvex_relays_failed_total",
        "Total failed relays by pipeline state and error kind",
        &["state", "kind", "uncertain"]
    ).unwrap();

    pub static ref RELAY_LATENCY: Histogram = register_histogram!(
        "betvex_relay_latency_seconds",
        "End-to-end latency of successful relays",
        vec![1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]
    ).unwrap();

    // RPC metrics
    pub static ref RPC_REQUESTS: CounterVec = register_counter_vec!(
        "betvex_rpc_requests_total",
        "Total JSON-RPC requests by method and result",
        &["method", "result"]
    ).unwrap();

    pub static ref RPC_LATENCY: HistogramVec = register_histogram_vec!(
        "betvex_rpc_latency_seconds",
        "JSON-RPC round trip latency",
        &["method"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    // Health metrics
    pub static ref RPC_HEALTHY: Gauge = register_gauge!(
        "betvex_rpc_healthy",
        "RPC node health (1=reachable and synced, 0=unavailable)"
    ).unwrap();

    pub static ref HEALTH_CHECK_SUCCESS: Counter = register_counter!(
        "betvex_health_check_success_total",
        "Total successful health checks"
    ).unwrap();

    pub static ref HEALTH_CHECK_FAILURE: Counter = register_counter!(
        "betvex_health_check_failure_total",
        "Total failed health checks"
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> RelayerResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| {
                RelayerError::Config(format!("cannot bind metrics port {}: {}", addr, e))
            })?;
        axum::serve(listener, app)
            .await
            .map_err(|e| RelayerError::Internal(format!("metrics server stopped: {}", e)))
    }
}

/// Render every registered metric in the text exposition format
pub fn render() -> RelayerResult<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| RelayerError::Internal(format!("metrics encoding failed: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| RelayerError::Internal(e.to_string()))
}

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    render().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

// Helper functions to record metrics

pub fn record_relay_started() {
    RELAYS_STARTED.inc();
}

pub fn record_relay_succeeded(latency: Duration) {
    RELAYS_SUCCEEDED.inc();
    RELAY_LATENCY.observe(latency.as_secs_f64());
}

pub fn record_relay_failed(failure: &RelayFailure) {
    let uncertain = if failure.is_uncertain() { "true" } else { "false" };
    RELAYS_FAILED
        .with_label_values(&[failure.state.as_str(), failure.error.kind(), uncertain])
        .inc();
}

pub fn record_rpc_request(method: &str, ok: bool, latency: Duration) {
    RPC_REQUESTS
        .with_label_values(&[method, if ok { "ok" } else { "error" }])
        .inc();
    RPC_LATENCY
        .with_label_values(&[method])
        .observe(latency.as_secs_f64());
}

pub fn record_rpc_health(healthy: bool) {
    RPC_HEALTHY.set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_health_check() {
    HEALTH_CHECK_SUCCESS.inc();
}

pub fn record_health_check_failure() {
    HEALTH_CHECK_FAILURE.inc();
}
