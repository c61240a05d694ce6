//! Saga state, signals and errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::model::{Destinations, Incident, IncidentPriority, IncidentStatus, Mission};

use super::AssignmentDelay;

// ============================================================================
// Signals
// ============================================================================

/// An external event delivered to a suspended instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "payload")]
pub enum Signal {
    /// Responder answered the availability request.
    ResponderAvailable(bool),
    MissionStarted,
    VictimPickedUp,
    VictimDelivered,
    MissionAborted,
}

/// Errors for malformed signals.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalError {
    #[error("unknown signal: {0}")]
    UnknownSignal(String),

    #[error("signal {signal} requires a boolean payload, got {got}")]
    InvalidPayload { signal: &'static str, got: String },
}

impl Signal {
    /// Wire name of the signal.
    pub fn name(&self) -> &'static str {
        match self {
            Signal::ResponderAvailable(_) => "ResponderAvailable",
            Signal::MissionStarted => "MissionStarted",
            Signal::VictimPickedUp => "VictimPickedUp",
            Signal::VictimDelivered => "VictimDelivered",
            Signal::MissionAborted => "MissionAborted",
        }
    }

    /// Build a signal from its name and optional JSON payload.
    ///
    /// `ResponderAvailable` requires a boolean payload. Payloads of the other
    /// signals are ignored.
    pub fn parse(name: &str, payload: Option<&serde_json::Value>) -> Result<Self, SignalError> {
        match name {
            "ResponderAvailable" => match payload {
                Some(serde_json::Value::Bool(available)) => {
                    Ok(Signal::ResponderAvailable(*available))
                }
                other => Err(SignalError::InvalidPayload {
                    signal: "ResponderAvailable",
                    got: other
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "nothing".to_string()),
                }),
            },
            "MissionStarted" => Ok(Signal::MissionStarted),
            "VictimPickedUp" => Ok(Signal::VictimPickedUp),
            "VictimDelivered" => Ok(Signal::VictimDelivered),
            "MissionAborted" => Ok(Signal::MissionAborted),
            other => Err(SignalError::UnknownSignal(other.to_string())),
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::ResponderAvailable(available) => write!(f, "ResponderAvailable({})", available),
            other => f.write_str(other.name()),
        }
    }
}

/// Result of delivering a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOutcome {
    /// The instance was waiting for the signal and advanced.
    Applied,
    /// The instance was not waiting for the signal. Nothing changed.
    Ignored,
}

// ============================================================================
// Wait state
// ============================================================================

/// How a completed instance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionOutcome {
    Delivered,
    Aborted,
}

/// What a persisted instance is suspended on.
///
/// ```text
/// Assigning -> AwaitingResponderAvailable -> AwaitingMissionStarted
///    |  ^              |                          |
///    v  |   (declined) v                          v
/// RetryPending <-------+                   AwaitingPickup -> AwaitingDelivery -> Completed
///
/// MissionAborted: AwaitingMissionStarted | AwaitingPickup | AwaitingDelivery -> Completed
/// Any gateway error -> Failed
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaitState {
    /// An assignment attempt is running.
    Assigning,

    /// No responder was assigned. Next attempt fires at `retry_at`.
    RetryPending { retry_at: DateTime<Utc> },

    /// A responder was proposed and reserved; waiting for confirmation.
    AwaitingResponderAvailable,

    /// Responder confirmed; waiting for the mission to start.
    AwaitingMissionStarted,

    /// Mission underway; waiting for the victim pickup.
    AwaitingPickup,

    /// Victim on board; waiting for delivery.
    AwaitingDelivery,

    /// Terminal: the lifecycle ended normally.
    Completed {
        outcome: CompletionOutcome,
        completed_at: DateTime<Utc>,
    },

    /// Terminal: a gateway call failed.
    Failed {
        error: String,
        failed_at: DateTime<Utc>,
    },
}

impl WaitState {
    /// Get the state type name (for filtering and display).
    pub fn state_type(&self) -> &'static str {
        match self {
            WaitState::Assigning => "assigning",
            WaitState::RetryPending { .. } => "retry_pending",
            WaitState::AwaitingResponderAvailable => "awaiting_responder_available",
            WaitState::AwaitingMissionStarted => "awaiting_mission_started",
            WaitState::AwaitingPickup => "awaiting_pickup",
            WaitState::AwaitingDelivery => "awaiting_delivery",
            WaitState::Completed { .. } => "completed",
            WaitState::Failed { .. } => "failed",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WaitState::Completed { .. } | WaitState::Failed { .. })
    }

    /// Whether the instance reacts to `signal` in this state.
    pub fn accepts(&self, signal: &Signal) -> bool {
        match (self, signal) {
            (WaitState::AwaitingResponderAvailable, Signal::ResponderAvailable(_)) => true,
            (WaitState::AwaitingMissionStarted, Signal::MissionStarted) => true,
            (WaitState::AwaitingPickup, Signal::VictimPickedUp) => true,
            (WaitState::AwaitingDelivery, Signal::VictimDelivered) => true,
            (
                WaitState::AwaitingMissionStarted
                | WaitState::AwaitingPickup
                | WaitState::AwaitingDelivery,
                Signal::MissionAborted,
            ) => true,
            _ => false,
        }
    }

    /// Names of the signals this state waits on.
    pub fn awaited_signals(&self) -> &'static [&'static str] {
        match self {
            WaitState::AwaitingResponderAvailable => &["ResponderAvailable"],
            WaitState::AwaitingMissionStarted => &["MissionStarted", "MissionAborted"],
            WaitState::AwaitingPickup => &["VictimPickedUp", "MissionAborted"],
            WaitState::AwaitingDelivery => &["VictimDelivered", "MissionAborted"],
            _ => &[],
        }
    }

    pub fn retry_at(&self) -> Option<DateTime<Utc>> {
        match self {
            WaitState::RetryPending { retry_at } => Some(*retry_at),
            _ => None,
        }
    }
}

// ============================================================================
// Instance state
// ============================================================================

/// Complete, resumable record of one incident orchestration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceState {
    pub incident: Incident,
    pub destinations: Destinations,
    pub assignment_delay: AssignmentDelay,
    /// Fetched once, before the first attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<IncidentPriority>,
    /// The live mission. Superseded missions are dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission: Option<Mission>,
    /// Number of assignment attempts started so far.
    pub attempts: u32,
    pub wait: WaitState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InstanceState {
    /// A fresh instance that has not run any step yet.
    ///
    /// The incident always enters the lifecycle as `Requested`, whatever
    /// status the caller supplied.
    pub fn new(
        mut incident: Incident,
        destinations: Destinations,
        delay: AssignmentDelay,
    ) -> Self {
        incident.status = IncidentStatus::Requested;
        let now = Utc::now();
        Self {
            incident,
            destinations,
            assignment_delay: delay,
            priority: None,
            mission: None,
            attempts: 0,
            wait: WaitState::Assigning,
            created_at: now,
            updated_at: now,
        }
    }

    /// Correlation key.
    pub fn id(&self) -> &str {
        &self.incident.id
    }

    pub fn is_terminal(&self) -> bool {
        self.wait.is_terminal()
    }

    pub(crate) fn transition(&mut self, wait: WaitState) {
        self.wait = wait;
        self.updated_at = Utc::now();
    }
}

/// Errors raised while running a saga step.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A gateway call failed. The instance is now `Failed`.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// `start` was called on an instance that already ran.
    #[error("instance {0} was already started")]
    AlreadyStarted(String),

    /// A responder confirmation arrived without an assigned mission on record.
    #[error("instance {0} has no assigned mission")]
    MissingMission(String),
}
