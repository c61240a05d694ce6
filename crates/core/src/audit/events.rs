use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },
    /// Suspended instances reloaded from the store at startup.
    InstancesRecovered {
        count: usize,
    },

    // Instance lifecycle
    InstanceStarted {
        incident_id: String,
        assignment_delay: String,
        destinations: usize,
    },
    WaitStateChanged {
        incident_id: String,
        from_state: String,
        to_state: String,
    },
    InstanceCompleted {
        incident_id: String,
        /// "delivered" or "aborted"
        outcome: String,
        attempts: u32,
    },
    InstanceFailed {
        incident_id: String,
        error: String,
        attempts: u32,
    },

    // Saga steps
    PriorityFetched {
        incident_id: String,
        priority: i64,
        escalated: bool,
    },
    AssignmentAttempted {
        incident_id: String,
        /// 1-based attempt number
        attempt: u32,
        /// Responders offered to the decision service
        responders: usize,
        /// Resulting mission status ("ASSIGNED" or "UNASSIGNED")
        mission_status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        responder_id: Option<String>,
    },
    MessagePublished {
        incident_id: String,
        message_type: String,
    },

    // Signals
    SignalApplied {
        incident_id: String,
        signal: String,
    },
    /// The instance was not waiting for this signal.
    SignalIgnored {
        incident_id: String,
        signal: String,
        wait_state: String,
    },
    /// The signal was malformed and never reached the instance.
    SignalRejected {
        incident_id: String,
        signal: String,
        reason: String,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::InstancesRecovered { .. } => "instances_recovered",
            Self::InstanceStarted { .. } => "instance_started",
            Self::WaitStateChanged { .. } => "wait_state_changed",
            Self::InstanceCompleted { .. } => "instance_completed",
            Self::InstanceFailed { .. } => "instance_failed",
            Self::PriorityFetched { .. } => "priority_fetched",
            Self::AssignmentAttempted { .. } => "assignment_attempted",
            Self::MessagePublished { .. } => "message_published",
            Self::SignalApplied { .. } => "signal_applied",
            Self::SignalIgnored { .. } => "signal_ignored",
            Self::SignalRejected { .. } => "signal_rejected",
        }
    }

    pub fn category(&self) -> AuditCategory {
        match self {
            Self::ServiceStarted { .. }
            | Self::ServiceStopped { .. }
            | Self::InstancesRecovered { .. } => AuditCategory::Service,
            Self::InstanceStarted { .. }
            | Self::WaitStateChanged { .. }
            | Self::InstanceCompleted { .. }
            | Self::InstanceFailed { .. } => AuditCategory::Instance,
            Self::PriorityFetched { .. } | Self::AssignmentAttempted { .. } => {
                AuditCategory::Assignment
            }
            Self::MessagePublished { .. } => AuditCategory::Message,
            Self::SignalApplied { .. }
            | Self::SignalIgnored { .. }
            | Self::SignalRejected { .. } => AuditCategory::Signal,
        }
    }

    /// Extract incident_id if this event is instance-related
    pub fn incident_id(&self) -> Option<&str> {
        match self {
            Self::InstanceStarted { incident_id, .. }
            | Self::WaitStateChanged { incident_id, .. }
            | Self::InstanceCompleted { incident_id, .. }
            | Self::InstanceFailed { incident_id, .. }
            | Self::PriorityFetched { incident_id, .. }
            | Self::AssignmentAttempted { incident_id, .. }
            | Self::MessagePublished { incident_id, .. }
            | Self::SignalApplied { incident_id, .. }
            | Self::SignalIgnored { incident_id, .. }
            | Self::SignalRejected { incident_id, .. } => Some(incident_id),
            Self::ServiceStarted { .. }
            | Self::ServiceStopped { .. }
            | Self::InstancesRecovered { .. } => None,
        }
    }
}

/// Coarse grouping of audit events, used to read one strand of an
/// incident's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    /// Service start/stop and recovery.
    Service,
    /// Instance start, wait-state changes, completion and failure.
    Instance,
    /// Priority lookup and assignment attempts.
    Assignment,
    /// Outbound messages.
    Message,
    /// Inbound signals, applied or not.
    Signal,
}

impl AuditCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditCategory::Service => "service",
            AuditCategory::Instance => "instance",
            AuditCategory::Assignment => "assignment",
            AuditCategory::Message => "message",
            AuditCategory::Signal => "signal",
        }
    }
}

impl std::fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub incident_id: Option<String>,
    pub data: AuditEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_service_started() {
        let event = AuditEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc123".to_string(),
        };
        assert_eq!(event.event_type(), "service_started");
        assert_eq!(event.incident_id(), None);
    }

    #[test]
    fn test_event_type_wait_state_changed() {
        let event = AuditEvent::WaitStateChanged {
            incident_id: "inc-123".to_string(),
            from_state: "assigning".to_string(),
            to_state: "retry_pending".to_string(),
        };
        assert_eq!(event.event_type(), "wait_state_changed");
        assert_eq!(event.incident_id(), Some("inc-123"));
    }

    #[test]
    fn test_event_type_signal_ignored() {
        let event = AuditEvent::SignalIgnored {
            incident_id: "inc-1".to_string(),
            signal: "VictimPickedUp".to_string(),
            wait_state: "awaiting_mission_started".to_string(),
        };
        assert_eq!(event.event_type(), "signal_ignored");
        assert_eq!(event.incident_id(), Some("inc-1"));
    }

    #[test]
    fn test_event_categories() {
        let ignored = AuditEvent::SignalIgnored {
            incident_id: "inc-1".to_string(),
            signal: "VictimPickedUp".to_string(),
            wait_state: "awaiting_mission_started".to_string(),
        };
        assert_eq!(ignored.category(), AuditCategory::Signal);
        assert_eq!(
            AuditEvent::InstancesRecovered { count: 2 }.category(),
            AuditCategory::Service
        );
        let fetched = AuditEvent::PriorityFetched {
            incident_id: "inc-1".to_string(),
            priority: 4,
            escalated: true,
        };
        assert_eq!(fetched.category(), AuditCategory::Assignment);

        let parsed: AuditCategory = serde_json::from_str("\"message\"").unwrap();
        assert_eq!(parsed, AuditCategory::Message);
        assert_eq!(parsed.to_string(), "message");
    }

    #[test]
    fn test_serialize_deserialize_assignment_attempted() {
        let event = AuditEvent::AssignmentAttempted {
            incident_id: "inc-1".to_string(),
            attempt: 2,
            responders: 5,
            mission_status: "UNASSIGNED".to_string(),
            responder_id: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"assignment_attempted\""));
        assert!(!json.contains("responder_id"));

        let deserialized: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.event_type(), "assignment_attempted");
        assert_eq!(deserialized.incident_id(), Some("inc-1"));
    }

    #[test]
    fn test_audit_record_serialize() {
        let record = AuditRecord {
            id: 1,
            timestamp: Utc::now(),
            event_type: "service_started".to_string(),
            incident_id: None,
            data: AuditEvent::ServiceStarted {
                version: "0.1.0".to_string(),
                config_hash: "abc123".to_string(),
            },
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"event_type\":\"service_started\""));
    }
}
