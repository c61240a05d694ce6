//! External task gateway.
//!
//! The saga reaches the outside world only through the four traits in this
//! module: responder lookup, priority lookup, assignment decision and message
//! publishing. Implementations must be safe to share across instances.

mod error;
mod http;
mod traits;
mod types;

use std::sync::Arc;

pub use error::GatewayError;
pub use http::{
    HttpAssignmentRules, HttpMessagePublisher, HttpPriorityService, HttpResponderDirectory,
};
pub use traits::{AssignmentRules, MessagePublisher, PriorityService, ResponderDirectory};
pub use types::{
    normalize_decision, AssignmentRequest, MessageType, OutboundMessage, RuleSession,
    RuleSessionKind,
};

use crate::config::ServicesConfig;

/// Handles to every external service used by the saga.
#[derive(Clone)]
pub struct Gateway {
    pub responders: Arc<dyn ResponderDirectory>,
    pub priority: Arc<dyn PriorityService>,
    pub rules: Arc<dyn AssignmentRules>,
    pub publisher: Arc<dyn MessagePublisher>,
}

impl Gateway {
    pub fn new(
        responders: Arc<dyn ResponderDirectory>,
        priority: Arc<dyn PriorityService>,
        rules: Arc<dyn AssignmentRules>,
        publisher: Arc<dyn MessagePublisher>,
    ) -> Self {
        Self {
            responders,
            priority,
            rules,
            publisher,
        }
    }

    /// Build HTTP clients for every service.
    pub fn http(config: &ServicesConfig) -> Result<Self, GatewayError> {
        Ok(Self::new(
            Arc::new(HttpResponderDirectory::new(config)?),
            Arc::new(HttpPriorityService::new(config)?),
            Arc::new(HttpAssignmentRules::new(config)?),
            Arc::new(HttpMessagePublisher::new(config)?),
        ))
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("responders", &self.responders.name())
            .field("priority", &self.priority.name())
            .field("rules", &self.rules.name())
            .field("publisher", &self.publisher.name())
            .finish()
    }
}
