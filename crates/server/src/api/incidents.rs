//! Incident instance endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use rescue_core::{InstanceFilter, InstanceSnapshot, RuntimeError, StartInstanceRequest};

use crate::state::AppState;

/// Maximum allowed limit for list queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for list queries
const DEFAULT_LIMIT: i64 = 100;

/// Error body shared by incident and signal endpoints.
#[derive(Debug, Serialize)]
pub struct IncidentErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<IncidentErrorResponse>);

/// Map a runtime error onto an HTTP status.
pub(crate) fn runtime_error(e: RuntimeError) -> ApiError {
    let status = match e {
        RuntimeError::InvalidIncident(_)
        | RuntimeError::InvalidDelay(_)
        | RuntimeError::InvalidSignal(_) => StatusCode::BAD_REQUEST,
        RuntimeError::AlreadyActive(_) => StatusCode::CONFLICT,
        RuntimeError::InstanceNotFound(_) => StatusCode::NOT_FOUND,
        RuntimeError::Saga(_) => StatusCode::BAD_GATEWAY,
        RuntimeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(IncidentErrorResponse {
            error: e.to_string(),
        }),
    )
}

/// Start an instance for a new incident.
///
/// The first assignment attempt runs before the response is sent, so the
/// returned snapshot already shows either a pending retry or a wait for the
/// responder's confirmation.
pub async fn start_incident(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartInstanceRequest>,
) -> Result<(StatusCode, Json<InstanceSnapshot>), ApiError> {
    let snapshot = state
        .runtime()
        .start_instance(request)
        .await
        .map_err(runtime_error)?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Query parameters for listing instances
#[derive(Debug, Deserialize)]
pub struct ListIncidentsParams {
    /// Filter by wait state (e.g. "awaiting_pickup")
    pub wait_state: Option<String>,
    /// Only non-terminal instances
    #[serde(default)]
    pub active: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListIncidentsResponse {
    pub instances: Vec<InstanceSnapshot>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

pub async fn list_incidents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListIncidentsParams>,
) -> Result<Json<ListIncidentsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = InstanceFilter::new();
    if let Some(wait_state) = params.wait_state {
        filter = filter.with_wait_state(wait_state);
    }
    if params.active {
        filter = filter.active();
    }

    let runtime = state.runtime();
    let total = runtime.count(&filter).await.map_err(runtime_error)?;
    let instances = runtime
        .list(&filter.with_limit(limit).with_offset(offset))
        .await
        .map_err(runtime_error)?;

    Ok(Json(ListIncidentsResponse {
        instances,
        total,
        limit,
        offset,
    }))
}

pub async fn get_incident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<InstanceSnapshot>, ApiError> {
    match state.runtime().instance(&id).await.map_err(runtime_error)? {
        Some(snapshot) => Ok(Json(snapshot)),
        None => Err(runtime_error(RuntimeError::InstanceNotFound(id))),
    }
}
