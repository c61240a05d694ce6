//! Incident assignment and mission lifecycle orchestration.
//!
//! One saga instance runs per incident: it asks the decision service for a
//! responder, retries on a timer until one is assigned, then follows the
//! mission through externally delivered signals until delivery or abort.

pub mod audit;
pub mod config;
pub mod gateway;
pub mod instance;
pub mod metrics;
pub mod model;
pub mod runtime;
pub mod saga;
pub mod testing;

pub use audit::{
    create_audit_system, AuditCategory, AuditError, AuditEvent, AuditFilter, AuditHandle,
    AuditRecord, AuditStore, AuditWriter, SqliteAuditStore,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use gateway::{Gateway, GatewayError, MessageType, OutboundMessage, RuleSession};
pub use instance::{InstanceFilter, InstanceStore, SqliteInstanceStore, StoreError};
pub use model::{
    Destination, Destinations, Incident, IncidentPriority, IncidentStatus, Mission, MissionStatus,
    Responder, Responders,
};
pub use runtime::{
    IncidentRuntime, InstanceSnapshot, RuntimeConfig, RuntimeError, RuntimeStatus,
    StartInstanceRequest,
};
pub use saga::{
    AssignmentDelay, IncidentSaga, InstanceState, SagaError, Signal, SignalError, SignalOutcome,
    WaitState,
};
