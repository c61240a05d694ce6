//! Audit trail endpoints.
//!
//! Both endpoints page forward with an id cursor: pass the returned
//! `next_after` back as `after` to read what was emitted since.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use rescue_core::{AuditCategory, AuditError, AuditFilter, AuditRecord, AuditStore};

use super::incidents::{ApiError, IncidentErrorResponse};
use crate::state::AppState;

/// Maximum allowed limit for audit queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for audit queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for the service-wide audit endpoint
#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    pub incident_id: Option<String>,
    /// One of service, instance, assignment, message, signal
    pub category: Option<AuditCategory>,
    pub event_type: Option<String>,
    /// Only events emitted at or after this instant (RFC 3339)
    pub since: Option<DateTime<Utc>>,
    /// Cursor: only events with a larger id
    pub after: Option<i64>,
    pub limit: Option<i64>,
}

/// Query parameters for an incident's timeline
#[derive(Debug, Deserialize)]
pub struct TimelineParams {
    pub category: Option<AuditCategory>,
    pub after: Option<i64>,
    pub limit: Option<i64>,
}

/// One page of audit events.
#[derive(Debug, Serialize)]
pub struct AuditPage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<String>,
    pub events: Vec<AuditRecord>,
    /// Cursor for the next page. Echoes `after` when the page is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_after: Option<i64>,
    /// Matching events past `next_after`.
    pub remaining: i64,
}

fn audit_error(e: AuditError) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(IncidentErrorResponse {
            error: format!("Failed to read audit events: {}", e),
        }),
    )
}

fn read_page(store: &dyn AuditStore, filter: AuditFilter) -> Result<AuditPage, ApiError> {
    let events = store.query(&filter).map_err(audit_error)?;
    let next_after = events.last().map(|record| record.id).or(filter.after_id);

    let remaining = match next_after {
        Some(id) => store.count(&filter.clone().after(id)),
        None => store.count(&filter),
    }
    .map_err(audit_error)?;

    Ok(AuditPage {
        incident_id: filter.incident_id,
        events,
        next_after,
        remaining,
    })
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Query audit events across the service
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditPage>, ApiError> {
    let mut filter = AuditFilter::new().with_limit(clamp_limit(params.limit));
    filter.incident_id = params.incident_id;
    filter.category = params.category;
    filter.event_type = params.event_type;
    filter.since = params.since;
    filter.after_id = params.after;

    read_page(state.audit_store(), filter).map(Json)
}

/// Timeline of one incident, in emission order.
///
/// History outlives the instance, so disposed incidents still answer.
pub async fn incident_timeline(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<TimelineParams>,
) -> Result<Json<AuditPage>, ApiError> {
    let mut filter = AuditFilter::for_incident(id).with_limit(clamp_limit(params.limit));
    filter.category = params.category;
    filter.after_id = params.after;

    read_page(state.audit_store(), filter).map(Json)
}
