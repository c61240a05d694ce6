use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{audit, handlers, incidents, middleware::metrics_middleware, runtime, signals};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Audit
        .route("/audit", get(audit::query_audit))
        // Incident instances
        .route(
            "/incidents",
            post(incidents::start_incident).get(incidents::list_incidents),
        )
        .route("/incidents/{id}", get(incidents::get_incident))
        .route("/incidents/{id}/audit", get(audit::incident_timeline))
        .route("/incidents/{id}/signals/{name}", post(signals::deliver_signal))
        // Runtime
        .route("/runtime/status", get(runtime::get_status));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
