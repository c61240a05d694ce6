use axum::{extract::State, Json};
use std::sync::Arc;
use rescue_core::RuntimeStatus;

use crate::state::AppState;

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<RuntimeStatus> {
    Json(state.runtime().status().await)
}
