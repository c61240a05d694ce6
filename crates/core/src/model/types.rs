//! Core incident and mission data types.

use serde::{Deserialize, Serialize};

// ============================================================================
// Incident
// ============================================================================

/// Lifecycle status of an incident, driven by the saga.
///
/// ```text
/// Requested -> Assigned -> PickedUp -> Delivered
///                 |           |
///                 +-----------+------> Aborted
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum IncidentStatus {
    /// Reported, no mission started yet.
    #[default]
    Requested,
    /// A responder has started the mission.
    Assigned,
    /// The victim has been picked up.
    PickedUp,
    /// The victim has been delivered to a destination (terminal).
    Delivered,
    /// The mission was aborted (terminal).
    Aborted,
}

impl IncidentStatus {
    /// Position along the lifecycle graph. Terminal states share the last rank.
    pub fn rank(&self) -> u8 {
        match self {
            IncidentStatus::Requested => 0,
            IncidentStatus::Assigned => 1,
            IncidentStatus::PickedUp => 2,
            IncidentStatus::Delivered | IncidentStatus::Aborted => 3,
        }
    }

    /// Returns true for `Delivered` and `Aborted`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IncidentStatus::Delivered | IncidentStatus::Aborted)
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Requested => "Requested",
            IncidentStatus::Assigned => "Assigned",
            IncidentStatus::PickedUp => "PickedUp",
            IncidentStatus::Delivered => "Delivered",
            IncidentStatus::Aborted => "Aborted",
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reported incident.
///
/// Only `id` and `status` are meaningful to the orchestrator; location and
/// victim details are carried through to collaborators untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Externally assigned identity, also the instance correlation key.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_people: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_needed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victim_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victim_phone_number: Option<String>,
    /// Epoch millis when the incident was reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_time: Option<i64>,
    #[serde(default)]
    pub status: IncidentStatus,
}

impl Incident {
    /// Create an incident with only its identity set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lat: None,
            lon: None,
            number_of_people: None,
            medical_needed: None,
            victim_name: None,
            victim_phone_number: None,
            reported_time: None,
            status: IncidentStatus::Requested,
        }
    }

    /// Set the incident location.
    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    /// Set the number of people involved.
    pub fn with_people(mut self, number_of_people: u32, medical_needed: bool) -> Self {
        self.number_of_people = Some(number_of_people);
        self.medical_needed = Some(medical_needed);
        self
    }
}

// ============================================================================
// Destinations and responders
// ============================================================================

/// A candidate drop-off site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Snapshot of destination sites supplied when an instance starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct Destinations(pub Vec<Destination>);

impl Destinations {
    pub fn new(destinations: Vec<Destination>) -> Self {
        Self(destinations)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An available responder as reported by the responder directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Responder {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boat_capacity: Option<u32>,
    #[serde(default)]
    pub has_medical_kit: bool,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

/// Point-in-time snapshot of responder candidates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct Responders(pub Vec<Responder>);

impl Responders {
    pub fn new(responders: Vec<Responder>) -> Self {
        Self(responders)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Priority
// ============================================================================

/// Priority classification for an incident. Consumed, never interpreted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncidentPriority {
    pub incident_id: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_priority: Option<f64>,
    #[serde(default)]
    pub escalated: bool,
}

impl IncidentPriority {
    pub fn new(incident_id: impl Into<String>, priority: i64) -> Self {
        Self {
            incident_id: incident_id.into(),
            priority,
            average_priority: None,
            escalated: false,
        }
    }
}

// ============================================================================
// Mission
// ============================================================================

/// Outcome of a mission assignment attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    /// Built by the orchestrator, not yet decided.
    Requested,
    /// A responder was proposed.
    Assigned,
    /// No responder could be proposed.
    Unassigned,
}

/// Proposed pairing of an incident with a responder and locations.
///
/// `responder_id` is set if and only if `status` is `Assigned`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub incident_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responder_id: Option<String>,
    pub status: MissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responder_start_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responder_start_long: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_long: Option<f64>,
}

impl Mission {
    /// A fresh mission awaiting a decision.
    pub fn requested(incident_id: impl Into<String>) -> Self {
        Self::with_status(incident_id, MissionStatus::Requested)
    }

    /// A mission with no responder and no locations.
    pub fn unassigned(incident_id: impl Into<String>) -> Self {
        Self::with_status(incident_id, MissionStatus::Unassigned)
    }

    /// An assigned mission for the given responder, without coordinates.
    pub fn assigned(incident_id: impl Into<String>, responder_id: impl Into<String>) -> Self {
        Self {
            responder_id: Some(responder_id.into()),
            ..Self::with_status(incident_id, MissionStatus::Assigned)
        }
    }

    fn with_status(incident_id: impl Into<String>, status: MissionStatus) -> Self {
        Self {
            incident_id: incident_id.into(),
            responder_id: None,
            status,
            responder_start_lat: None,
            responder_start_long: None,
            destination_lat: None,
            destination_long: None,
        }
    }

    /// Set the responder start location.
    pub fn with_responder_start(mut self, lat: f64, long: f64) -> Self {
        self.responder_start_lat = Some(lat);
        self.responder_start_long = Some(long);
        self
    }

    /// Set the destination location.
    pub fn with_destination(mut self, lat: f64, long: f64) -> Self {
        self.destination_lat = Some(lat);
        self.destination_long = Some(long);
        self
    }

    /// Returns true when the mission carries an accepted assignment.
    pub fn is_assigned(&self) -> bool {
        self.status == MissionStatus::Assigned && self.responder_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_status_rank_is_monotonic() {
        assert!(IncidentStatus::Requested.rank() < IncidentStatus::Assigned.rank());
        assert!(IncidentStatus::Assigned.rank() < IncidentStatus::PickedUp.rank());
        assert!(IncidentStatus::PickedUp.rank() < IncidentStatus::Delivered.rank());
        assert_eq!(
            IncidentStatus::Delivered.rank(),
            IncidentStatus::Aborted.rank()
        );
        assert!(IncidentStatus::Aborted.is_terminal());
        assert!(!IncidentStatus::PickedUp.is_terminal());
    }

    #[test]
    fn test_incident_status_wire_names() {
        let json = serde_json::to_string(&IncidentStatus::PickedUp).unwrap();
        assert_eq!(json, "\"PickedUp\"");
        assert_eq!(IncidentStatus::Aborted.to_string(), "Aborted");
    }

    #[test]
    fn test_incident_deserialize_minimal() {
        let incident: Incident = serde_json::from_str(r#"{"id":"inc-1"}"#).unwrap();
        assert_eq!(incident.id, "inc-1");
        assert_eq!(incident.status, IncidentStatus::Requested);
        assert!(incident.lat.is_none());
    }

    #[test]
    fn test_incident_serializes_camel_case() {
        let incident = Incident::new("inc-2").with_people(3, true);
        let json = serde_json::to_value(&incident).unwrap();
        assert_eq!(json["numberOfPeople"], 3);
        assert_eq!(json["medicalNeeded"], true);
        assert_eq!(json["status"], "Requested");
        assert!(json.get("victimName").is_none());
    }

    #[test]
    fn test_mission_constructors() {
        let requested = Mission::requested("inc-1");
        assert_eq!(requested.status, MissionStatus::Requested);
        assert!(!requested.is_assigned());

        let unassigned = Mission::unassigned("inc-1");
        assert_eq!(unassigned.status, MissionStatus::Unassigned);
        assert!(unassigned.responder_id.is_none());

        let assigned = Mission::assigned("inc-1", "r-1")
            .with_responder_start(30.12345, -77.98765)
            .with_destination(31.98765, -78.13579);
        assert!(assigned.is_assigned());
        assert_eq!(assigned.responder_start_lat, Some(30.12345));
        assert_eq!(assigned.destination_long, Some(-78.13579));
    }

    #[test]
    fn test_mission_assigned_without_responder_is_not_assigned() {
        let mut mission = Mission::requested("inc-1");
        mission.status = MissionStatus::Assigned;
        assert!(!mission.is_assigned());
    }

    #[test]
    fn test_mission_status_wire_names() {
        let mission = Mission::unassigned("inc-1");
        let json = serde_json::to_value(&mission).unwrap();
        assert_eq!(json["status"], "UNASSIGNED");
        assert_eq!(json["incidentId"], "inc-1");
        assert!(json.get("responderId").is_none());
    }

    #[test]
    fn test_responders_transparent() {
        let responders: Responders =
            serde_json::from_str(r#"[{"id":"r-1","boatCapacity":4},{"id":"r-2"}]"#).unwrap();
        assert_eq!(responders.len(), 2);
        assert_eq!(responders.0[0].boat_capacity, Some(4));
        assert!(responders.0[1].available);
    }
}
