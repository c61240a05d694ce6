//! Signal delivery endpoint.
//!
//! Signal names are matched case-sensitively against the wire names
//! (`ResponderAvailable`, `MissionStarted`, `VictimPickedUp`,
//! `VictimDelivered`, `MissionAborted`).

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use rescue_core::SignalOutcome;

use super::incidents::{runtime_error, ApiError, IncidentErrorResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SignalResponse {
    pub incident_id: String,
    pub signal: String,
    pub outcome: SignalOutcome,
}

/// Deliver a named signal to a running instance.
///
/// The body is optional. When present it must be JSON and is handed to the
/// signal parser as its payload (e.g. `true` for `ResponderAvailable`).
pub async fn deliver_signal(
    State(state): State<Arc<AppState>>,
    Path((id, name)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<SignalResponse>, ApiError> {
    let payload: Option<Value> = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => Some(value),
            Err(e) => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(IncidentErrorResponse {
                        error: format!("Invalid signal payload: {}", e),
                    }),
                ))
            }
        }
    };

    let outcome = state
        .runtime()
        .deliver(&id, &name, payload.as_ref())
        .await
        .map_err(runtime_error)?;

    Ok(Json(SignalResponse {
        incident_id: id,
        signal: name,
        outcome,
    }))
}
