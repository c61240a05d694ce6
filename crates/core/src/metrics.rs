//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Instance lifecycle (started, completed, failed, active)
//! - Assignment attempts and signal deliveries
//! - Outbound messages and external service calls

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Instance Metrics
// =============================================================================

/// Instances started total.
pub static INSTANCES_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "rescue_instances_started_total",
        "Total incident instances started",
    )
    .unwrap()
});

/// Instances finished total by outcome.
pub static INSTANCES_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "rescue_instances_finished_total",
            "Total incident instances that reached a terminal state",
        ),
        &["outcome"], // "delivered", "aborted", "failed"
    )
    .unwrap()
});

/// Instances currently held by the runtime.
pub static ACTIVE_INSTANCES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "rescue_active_instances",
        "Number of non-terminal incident instances",
    )
    .unwrap()
});

/// Lifetime of an instance from start to terminal state, in seconds.
pub static INSTANCE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "rescue_instance_duration_seconds",
            "Time from instance start to terminal state",
        )
        .buckets(vec![
            60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0, 14400.0, 43200.0, 86400.0,
        ]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Saga Metrics
// =============================================================================

/// Assignment attempts total by result.
pub static ASSIGNMENT_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "rescue_assignment_attempts_total",
            "Total mission assignment attempts",
        ),
        &["result"], // "assigned", "unassigned", "error"
    )
    .unwrap()
});

/// Signals delivered total by name and outcome.
pub static SIGNALS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("rescue_signals_total", "Total signals delivered"),
        &["signal", "outcome"], // outcome: "applied", "ignored", "rejected", "failed"
    )
    .unwrap()
});

/// Outbound messages published total by type.
pub static MESSAGES_PUBLISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "rescue_messages_published_total",
            "Total outbound messages published",
        ),
        &["message_type"],
    )
    .unwrap()
});

/// Retry timers fired total.
pub static TIMERS_FIRED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("rescue_timers_fired_total", "Total retry timers fired").unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "rescue_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "rescue_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Record the outcome and latency of one external call.
pub fn observe_external_call(service: &str, operation: &str, started: std::time::Instant, ok: bool) {
    EXTERNAL_SERVICE_DURATION
        .with_label_values(&[service, operation])
        .observe(started.elapsed().as_secs_f64());
    EXTERNAL_SERVICE_REQUESTS
        .with_label_values(&[service, operation, if ok { "success" } else { "error" }])
        .inc();
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Instances
        Box::new(INSTANCES_STARTED.clone()),
        Box::new(INSTANCES_FINISHED.clone()),
        Box::new(ACTIVE_INSTANCES.clone()),
        Box::new(INSTANCE_DURATION.clone()),
        // Saga
        Box::new(ASSIGNMENT_ATTEMPTS.clone()),
        Box::new(SIGNALS_TOTAL.clone()),
        Box::new(MESSAGES_PUBLISHED.clone()),
        Box::new(TIMERS_FIRED.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}
