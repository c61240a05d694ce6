//! Types for the incident runtime.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::instance::StoreError;
use crate::model::{Destinations, Incident, IncidentPriority, IncidentStatus, Mission};
use crate::saga::{DurationError, InstanceState, SagaError, SignalError, WaitState};

/// Errors that can occur in the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The start request carried an unusable incident.
    #[error("invalid incident: {0}")]
    InvalidIncident(String),

    /// An instance with this correlation key is still running.
    #[error("instance already active for incident {0}")]
    AlreadyActive(String),

    /// The assignment delay could not be parsed.
    #[error("invalid assignment delay: {0}")]
    InvalidDelay(#[from] DurationError),

    /// No active instance for this correlation key.
    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    /// The signal name or payload was malformed.
    #[error("invalid signal: {0}")]
    InvalidSignal(#[from] SignalError),

    /// A saga step failed. The instance is now failed.
    #[error("saga error: {0}")]
    Saga(#[from] SagaError),

    /// Instance store error.
    #[error("instance store error: {0}")]
    Store(#[from] StoreError),
}

/// Parameters for starting an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInstanceRequest {
    pub incident: Incident,
    #[serde(default)]
    pub destinations: Destinations,
    /// Retry delay such as "PT60S". Falls back to the configured default.
    #[serde(default, alias = "assignment_delay")]
    pub assignment_delay: Option<String>,
}

impl StartInstanceRequest {
    pub fn new(incident: Incident, destinations: Destinations) -> Self {
        Self {
            incident,
            destinations,
            assignment_delay: None,
        }
    }

    pub fn with_assignment_delay(mut self, delay: impl Into<String>) -> Self {
        self.assignment_delay = Some(delay.into());
        self
    }
}

/// Read-only view of an instance for inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub incident_id: String,
    pub incident_status: IncidentStatus,
    /// Wait-state type, e.g. "awaiting_pickup".
    pub wait_state: String,
    /// Signals the instance is suspended on.
    pub awaiting: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub assignment_delay: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<IncidentPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission: Option<Mission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub terminal: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&InstanceState> for InstanceSnapshot {
    fn from(state: &InstanceState) -> Self {
        let error = match state.wait {
            WaitState::Failed { ref error, .. } => Some(error.clone()),
            _ => None,
        };

        Self {
            incident_id: state.incident.id.clone(),
            incident_status: state.incident.status,
            wait_state: state.wait.state_type().to_string(),
            awaiting: state
                .wait
                .awaited_signals()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            retry_at: state.wait.retry_at(),
            attempts: state.attempts,
            assignment_delay: state.assignment_delay.to_string(),
            priority: state.priority.clone(),
            mission: state.mission.clone(),
            error,
            terminal: state.is_terminal(),
            created_at: state.created_at,
            updated_at: state.updated_at,
        }
    }
}

/// Current status of the runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeStatus {
    /// Whether the timer loop is running.
    pub running: bool,
    /// Instances held in memory.
    pub active_instances: usize,
    /// Armed retry timers, including stale ones not yet popped.
    pub pending_timers: usize,
    /// Earliest armed deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_timer_due: Option<DateTime<Utc>>,
    /// Stored instances per wait-state type.
    pub by_wait_state: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saga::AssignmentDelay;
    use crate::testing::fixtures;

    #[test]
    fn test_start_request_accepts_wire_names() {
        let json = r#"{
            "incident": {"id": "X"},
            "destinations": [{"name": "Base", "lat": 1.0, "lon": 2.0}],
            "assignmentDelay": "PT60S"
        }"#;
        let request: StartInstanceRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.incident.id, "X");
        assert_eq!(request.destinations.len(), 1);
        assert_eq!(request.assignment_delay.as_deref(), Some("PT60S"));

        let minimal: StartInstanceRequest =
            serde_json::from_str(r#"{"incident": {"id": "Y"}}"#).unwrap();
        assert!(minimal.destinations.is_empty());
        assert!(minimal.assignment_delay.is_none());
    }

    #[test]
    fn test_snapshot_from_failed_state() {
        let mut state = InstanceState::new(
            fixtures::incident("inc-1"),
            fixtures::destinations(),
            AssignmentDelay::parse("PT1S").unwrap(),
        );
        state.attempts = 2;
        state.wait = WaitState::Failed {
            error: "boom".to_string(),
            failed_at: Utc::now(),
        };

        let snapshot = InstanceSnapshot::from(&state);
        assert_eq!(snapshot.wait_state, "failed");
        assert_eq!(snapshot.error.as_deref(), Some("boom"));
        assert!(snapshot.terminal);
        assert!(snapshot.awaiting.is_empty());
        assert_eq!(snapshot.assignment_delay, "PT1S");
    }

    #[test]
    fn test_snapshot_lists_awaited_signals() {
        let mut state = InstanceState::new(
            fixtures::incident("inc-2"),
            fixtures::destinations(),
            AssignmentDelay::parse("PT1S").unwrap(),
        );
        state.wait = WaitState::AwaitingPickup;

        let snapshot = InstanceSnapshot::from(&state);
        assert_eq!(snapshot.awaiting, vec!["VictimPickedUp", "MissionAborted"]);
        assert!(!snapshot.terminal);
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn test_error_display() {
        let err = RuntimeError::AlreadyActive("X".to_string());
        assert_eq!(err.to_string(), "instance already active for incident X");

        let err = RuntimeError::InstanceNotFound("Y".to_string());
        assert_eq!(err.to_string(), "instance not found: Y");
    }
}
