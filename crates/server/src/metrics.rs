//! Prometheus metrics for observability.
//!
//! HTTP request metrics live here; saga and runtime metrics come from
//! `rescue_core::metrics` and are registered into the same registry.
//! Instance counts per wait state are collected on scrape.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use rescue_core::runtime::WAIT_STATE_TYPES;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "rescue_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("rescue_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "rescue_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Runtime Metrics (collected dynamically)
// =============================================================================

/// Runtime running state (1 = running, 0 = stopped).
pub static RUNTIME_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "rescue_runtime_running",
        "Whether the timer loop is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Pending retry timers.
pub static PENDING_TIMERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("rescue_pending_timers", "Number of armed retry timers").unwrap()
});

/// Active instances by wait state.
pub static INSTANCES_BY_WAIT_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "rescue_instances_by_wait_state",
            "Stored instance count by wait state",
        ),
        &["wait_state"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Runtime
    registry
        .register(Box::new(RUNTIME_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(PENDING_TIMERS.clone()))
        .unwrap();
    registry
        .register(Box::new(INSTANCES_BY_WAIT_STATE.clone()))
        .unwrap();

    // Core metrics (instances, saga steps, external services)
    for metric in rescue_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the runtime at scrape time.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.runtime().status().await;
    RUNTIME_RUNNING.set(if status.running { 1 } else { 0 });
    PENDING_TIMERS.set(status.pending_timers as i64);

    for wait_state in WAIT_STATE_TYPES {
        let count = status.by_wait_state.get(*wait_state).copied().unwrap_or(0);
        INSTANCES_BY_WAIT_STATE
            .with_label_values(&[*wait_state])
            .set(count as i64);
    }
}

static INCIDENT_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/incidents/[^/]+").unwrap());

static SIGNAL_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/signals/[^/]+").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
///
/// Incident ids are caller-chosen strings, so the whole segment after
/// `/incidents/` is replaced. Signal names are kept bounded the same way.
pub fn normalize_path(path: &str) -> String {
    let result = INCIDENT_SEGMENT.replace_all(path, "/incidents/{id}");
    let result = SIGNAL_SEGMENT.replace_all(&result, "/signals/{name}");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_incident() {
        let path = "/api/v1/incidents/incident-42";
        assert_eq!(normalize_path(path), "/api/v1/incidents/{id}");
    }

    #[test]
    fn test_normalize_path_signal() {
        let path = "/api/v1/incidents/X/signals/ResponderAvailable";
        assert_eq!(
            normalize_path(path),
            "/api/v1/incidents/{id}/signals/{name}"
        );
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(normalize_path("/api/v1/incidents"), "/api/v1/incidents");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("rescue_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        RUNTIME_RUNNING.set(0);
        INSTANCES_BY_WAIT_STATE
            .with_label_values(&["retry_pending"])
            .set(0);
        rescue_core::metrics::INSTANCES_STARTED.inc_by(0);
        rescue_core::metrics::ACTIVE_INSTANCES.set(0);

        let output = encode_metrics();

        assert!(output.contains("rescue_runtime_running"));
        assert!(output.contains("rescue_instances_by_wait_state"));
        assert!(output.contains("rescue_instances_started_total"));
        assert!(output.contains("rescue_active_instances"));
    }
}
