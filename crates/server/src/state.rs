use std::sync::Arc;

use rescue_core::{AuditStore, Config, IncidentRuntime, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    runtime: Arc<IncidentRuntime>,
    audit_store: Arc<dyn AuditStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        runtime: Arc<IncidentRuntime>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            config,
            runtime,
            audit_store,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn runtime(&self) -> &IncidentRuntime {
        self.runtime.as_ref()
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }
}
