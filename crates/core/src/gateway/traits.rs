//! Contracts for the external services the saga drives.

use async_trait::async_trait;

use crate::model::{Incident, IncidentPriority, Mission, Responders};

use super::{AssignmentRequest, GatewayError, OutboundMessage};

/// Source of available responders.
#[async_trait]
pub trait ResponderDirectory: Send + Sync {
    /// Service name for logging/audit.
    fn name(&self) -> &str;

    /// Fetch a fresh snapshot of available responders.
    async fn fetch_responders(&self) -> Result<Responders, GatewayError>;
}

/// Incident priority classification.
#[async_trait]
pub trait PriorityService: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_priority(&self, incident: &Incident) -> Result<IncidentPriority, GatewayError>;
}

/// Decision service that proposes a mission for an incident.
///
/// Returning a mission that is not `ASSIGNED` is a normal outcome.
#[async_trait]
pub trait AssignmentRules: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(&self, request: AssignmentRequest) -> Result<Mission, GatewayError>;
}

/// Outbound message transport.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    fn name(&self) -> &str;

    /// Publish a message. Returns once the transport accepted it.
    async fn publish(&self, message: &OutboundMessage) -> Result<(), GatewayError>;
}
