//! Test utilities and mock implementations.
//!
//! This module provides mock implementations of every external service the
//! saga talks to, for use in unit and integration tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use rescue_core::testing::{fixtures, MockGateway};
//!
//! let mock = MockGateway::new();
//! mock.rules
//!     .push_decision(fixtures::assigned_mission("X", "R1"))
//!     .await;
//!
//! let saga = IncidentSaga::new(mock.gateway(), RuleSession::default());
//! // ... drive the saga ...
//! assert_eq!(mock.publisher.published().await.len(), 1);
//! ```

mod mock_priority;
mod mock_publisher;
mod mock_responders;
mod mock_rules;

pub use mock_priority::MockPriorityService;
pub use mock_publisher::MockMessagePublisher;
pub use mock_responders::MockResponderDirectory;
pub use mock_rules::MockAssignmentRules;

use std::sync::Arc;

use crate::gateway::Gateway;

/// All four mock services, wired together.
///
/// The fields stay accessible after `gateway()` so tests can configure and
/// inspect the mocks the saga is using.
#[derive(Debug, Default)]
pub struct MockGateway {
    pub responders: Arc<MockResponderDirectory>,
    pub priority: Arc<MockPriorityService>,
    pub rules: Arc<MockAssignmentRules>,
    pub publisher: Arc<MockMessagePublisher>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a `Gateway` backed by these mocks.
    pub fn gateway(&self) -> Gateway {
        Gateway::new(
            self.responders.clone(),
            self.priority.clone(),
            self.rules.clone(),
            self.publisher.clone(),
        )
    }
}

/// Test fixtures for common data types.
pub mod fixtures {
    use crate::model::{Destination, Destinations, Incident, Mission, Responder, Responders};

    /// An incident with a location and people to rescue.
    pub fn incident(id: &str) -> Incident {
        Incident::new(id)
            .with_location(34.12345, -77.12345)
            .with_people(3, true)
    }

    /// Two destination sites.
    pub fn destinations() -> Destinations {
        Destinations::new(vec![
            Destination {
                name: "Wilmington Medical Center".to_string(),
                lat: 34.1706,
                lon: -77.949,
            },
            Destination {
                name: "New Hanover Regional".to_string(),
                lat: 31.98765,
                lon: -78.13579,
            },
        ])
    }

    /// A responder available at the given position.
    pub fn responder(id: &str, lat: f64, lon: f64) -> Responder {
        Responder {
            id: id.to_string(),
            name: Some(format!("Responder {}", id)),
            phone_number: None,
            latitude: Some(lat),
            longitude: Some(lon),
            boat_capacity: Some(6),
            has_medical_kit: true,
            available: true,
        }
    }

    /// Two available responders.
    pub fn responders() -> Responders {
        Responders::new(vec![
            responder("R1", 30.12345, -77.98765),
            responder("R2", 34.2, -77.8),
        ])
    }

    /// An assigned mission with responder start and destination coordinates.
    pub fn assigned_mission(incident_id: &str, responder_id: &str) -> Mission {
        Mission::assigned(incident_id, responder_id)
            .with_responder_start(30.12345, -77.98765)
            .with_destination(31.98765, -78.13579)
    }
}
