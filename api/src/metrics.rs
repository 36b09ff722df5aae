//! # Prometheus Metrics
//!
//! Operational metrics for the gateway API, scraped at `GET /metrics` on
//! the main service port.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] so nothing
//! collides with consumers of the default global registry.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Shared handle used by the router and request handlers.
pub type SharedMetrics = Arc<ApiMetrics>;

/// Holds all Prometheus metric handles for the service.
pub struct ApiMetrics {
    /// Registry that owns all metrics below.
    registry: Registry,
    /// Transactions submitted through `/api/invoke`, committed or not.
    pub invokes_total: IntCounter,
    /// Read-only queries served through `/api/evaluate`.
    pub evaluates_total: IntCounter,
    /// Failed gateway calls, labeled by error kind
    /// (`transport`, `network`, `commit_timeout`, ...).
    pub failures_total: IntCounterVec,
    /// End-to-end latency of gateway calls in seconds.
    pub call_latency_seconds: Histogram,
}

impl ApiMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("conduit".into()), None)
            .expect("failed to create prometheus registry");

        let invokes_total = IntCounter::new(
            "invokes_total",
            "Transactions submitted through the invoke endpoint",
        )
        .expect("metric creation");
        registry
            .register(Box::new(invokes_total.clone()))
            .expect("metric registration");

        let evaluates_total = IntCounter::new(
            "evaluates_total",
            "Read-only queries served through the evaluate endpoint",
        )
        .expect("metric creation");
        registry
            .register(Box::new(evaluates_total.clone()))
            .expect("metric registration");

        let failures_total = IntCounterVec::new(
            Opts::new("failures_total", "Failed gateway calls by error kind"),
            &["kind"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(failures_total.clone()))
            .expect("metric registration");

        let call_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "call_latency_seconds",
                "End-to-end gateway call latency in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(call_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            invokes_total,
            evaluates_total,
            failures_total,
            call_latency_seconds,
        }
    }

    /// Encodes all registered metrics in the Prometheus text exposition
    /// format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Axum handler for `GET /metrics`.
pub async fn metrics_handler(State(state): State<crate::server::AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding failed: {e}"),
        ),
    }
}
