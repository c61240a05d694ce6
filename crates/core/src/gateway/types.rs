//! Request and message types exchanged with external services.

use serde::{Deserialize, Serialize};

use crate::model::{Destinations, Incident, IncidentPriority, Mission, MissionStatus, Responders};

use super::GatewayError;

// ============================================================================
// Assignment decision
// ============================================================================

/// Session kind requested from the rule engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleSessionKind {
    #[default]
    Stateless,
    Stateful,
}

/// Names the rule session the decision service evaluates against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleSession {
    /// Rule language, e.g. "DRL".
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub kind: RuleSessionKind,
    /// Session name registered with the rule engine.
    #[serde(default = "default_session_name")]
    pub name: String,
}

fn default_language() -> String {
    "DRL".to_string()
}

fn default_session_name() -> String {
    "mission-assignment-session".to_string()
}

impl Default for RuleSession {
    fn default() -> Self {
        Self {
            language: default_language(),
            kind: RuleSessionKind::default(),
            name: default_session_name(),
        }
    }
}

/// Inputs to a single assignment decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    pub session: RuleSession,
    pub incident: Incident,
    pub destinations: Destinations,
    pub responders: Responders,
    pub priority: IncidentPriority,
    /// Always in `REQUESTED` status when sent.
    pub mission: Mission,
}

/// Interpret a decision returned for `incident_id`.
///
/// Anything that is not an assignment becomes a clean `UNASSIGNED` mission.
/// An `ASSIGNED` mission without a responder is rejected.
pub fn normalize_decision(incident_id: &str, decided: Mission) -> Result<Mission, GatewayError> {
    match decided.status {
        MissionStatus::Assigned => {
            if decided.responder_id.as_deref().is_none_or(str::is_empty) {
                return Err(GatewayError::InvalidDecision {
                    incident_id: incident_id.to_string(),
                    reason: "assigned mission has no responder".to_string(),
                });
            }
            if decided.incident_id != incident_id {
                return Err(GatewayError::InvalidDecision {
                    incident_id: incident_id.to_string(),
                    reason: format!("mission belongs to incident {}", decided.incident_id),
                });
            }
            Ok(decided)
        }
        MissionStatus::Requested | MissionStatus::Unassigned => {
            Ok(Mission::unassigned(incident_id))
        }
    }
}

// ============================================================================
// Outbound messages
// ============================================================================

/// Kind of outbound message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MessageType {
    SetResponderUnavailable,
    IncidentAssignment,
    CreateMission,
    UpdateIncident,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::SetResponderUnavailable => "SetResponderUnavailable",
            MessageType::IncidentAssignment => "IncidentAssignment",
            MessageType::CreateMission => "CreateMission",
            MessageType::UpdateIncident => "UpdateIncident",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state-transition message published by the saga.
///
/// Serialized as `{"messageType": "...", "payload": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "messageType", content = "payload")]
pub enum OutboundMessage {
    /// Reserve the proposed responder while availability is confirmed.
    SetResponderUnavailable(Mission),
    /// Announce the outcome of an assignment attempt.
    IncidentAssignment(Mission),
    /// Ask the mission service to create the confirmed mission.
    CreateMission(Mission),
    /// Broadcast an incident status change.
    UpdateIncident(Incident),
}

impl OutboundMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            OutboundMessage::SetResponderUnavailable(_) => MessageType::SetResponderUnavailable,
            OutboundMessage::IncidentAssignment(_) => MessageType::IncidentAssignment,
            OutboundMessage::CreateMission(_) => MessageType::CreateMission,
            OutboundMessage::UpdateIncident(_) => MessageType::UpdateIncident,
        }
    }

    /// Incident the message refers to.
    pub fn incident_id(&self) -> &str {
        match self {
            OutboundMessage::SetResponderUnavailable(m)
            | OutboundMessage::IncidentAssignment(m)
            | OutboundMessage::CreateMission(m) => &m.incident_id,
            OutboundMessage::UpdateIncident(i) => &i.id,
        }
    }

    pub fn mission(&self) -> Option<&Mission> {
        match self {
            OutboundMessage::SetResponderUnavailable(m)
            | OutboundMessage::IncidentAssignment(m)
            | OutboundMessage::CreateMission(m) => Some(m),
            OutboundMessage::UpdateIncident(_) => None,
        }
    }

    pub fn incident(&self) -> Option<&Incident> {
        match self {
            OutboundMessage::UpdateIncident(i) => Some(i),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IncidentStatus;

    #[test]
    fn test_rule_session_defaults() {
        let session = RuleSession::default();
        assert_eq!(session.language, "DRL");
        assert_eq!(session.kind, RuleSessionKind::Stateless);
        assert_eq!(session.name, "mission-assignment-session");
    }

    #[test]
    fn test_normalize_unassigned_strips_fields() {
        let mut decided = Mission::assigned("inc-1", "r-1").with_destination(1.0, 2.0);
        decided.status = MissionStatus::Unassigned;
        let normalized = normalize_decision("inc-1", decided).unwrap();
        assert_eq!(normalized, Mission::unassigned("inc-1"));
    }

    #[test]
    fn test_normalize_requested_is_unassigned() {
        let normalized = normalize_decision("inc-1", Mission::requested("inc-1")).unwrap();
        assert_eq!(normalized.status, MissionStatus::Unassigned);
    }

    #[test]
    fn test_normalize_assigned_kept() {
        let decided = Mission::assigned("inc-1", "r-1").with_responder_start(1.0, 2.0);
        let normalized = normalize_decision("inc-1", decided.clone()).unwrap();
        assert_eq!(normalized, decided);
    }

    #[test]
    fn test_normalize_assigned_without_responder_rejected() {
        let mut decided = Mission::requested("inc-1");
        decided.status = MissionStatus::Assigned;
        let result = normalize_decision("inc-1", decided);
        assert!(matches!(result, Err(GatewayError::InvalidDecision { .. })));
    }

    #[test]
    fn test_normalize_assigned_for_other_incident_rejected() {
        let decided = Mission::assigned("inc-2", "r-1");
        let result = normalize_decision("inc-1", decided);
        assert!(matches!(result, Err(GatewayError::InvalidDecision { .. })));
    }

    #[test]
    fn test_outbound_message_envelope() {
        let msg = OutboundMessage::SetResponderUnavailable(Mission::assigned("inc-1", "r-1"));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["messageType"], "SetResponderUnavailable");
        assert_eq!(json["payload"]["responderId"], "r-1");
        assert_eq!(json["payload"]["status"], "ASSIGNED");
    }

    #[test]
    fn test_update_incident_envelope() {
        let mut incident = Incident::new("inc-1");
        incident.status = IncidentStatus::PickedUp;
        let msg = OutboundMessage::UpdateIncident(incident);
        assert_eq!(msg.message_type(), MessageType::UpdateIncident);
        assert_eq!(msg.incident_id(), "inc-1");
        assert!(msg.mission().is_none());

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["payload"]["status"], "PickedUp");
    }
}
