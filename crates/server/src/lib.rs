//! HTTP surface of the incident runtime.
//!
//! Exposes instance start, signal delivery, inspection and the audit trail
//! over a JSON API, plus Prometheus metrics.

pub mod api;
pub mod metrics;
pub mod state;
