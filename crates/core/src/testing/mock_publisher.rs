//! Mock message publisher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::gateway::{GatewayError, MessagePublisher, MessageType, OutboundMessage};

/// Mock implementation of the MessagePublisher trait.
///
/// Keeps every published message in order.
pub struct MockMessagePublisher {
    published: Arc<RwLock<Vec<OutboundMessage>>>,
    fail: Arc<RwLock<bool>>,
}

impl std::fmt::Debug for MockMessagePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockMessagePublisher")
            .field("published", &"<published>")
            .finish()
    }
}

impl Default for MockMessagePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMessagePublisher {
    pub fn new() -> Self {
        Self {
            published: Arc::new(RwLock::new(Vec::new())),
            fail: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    /// All published messages, in publish order.
    pub async fn published(&self) -> Vec<OutboundMessage> {
        self.published.read().await.clone()
    }

    /// Messages published for one incident, in publish order.
    pub async fn published_for(&self, incident_id: &str) -> Vec<OutboundMessage> {
        self.published
            .read()
            .await
            .iter()
            .filter(|m| m.incident_id() == incident_id)
            .cloned()
            .collect()
    }

    /// Message types published for one incident, in publish order.
    pub async fn types_for(&self, incident_id: &str) -> Vec<MessageType> {
        self.published_for(incident_id)
            .await
            .iter()
            .map(|m| m.message_type())
            .collect()
    }

    pub async fn clear(&self) {
        self.published.write().await.clear();
    }
}

#[async_trait]
impl MessagePublisher for MockMessagePublisher {
    fn name(&self) -> &str {
        "mock-publisher"
    }

    async fn publish(&self, message: &OutboundMessage) -> Result<(), GatewayError> {
        if *self.fail.read().await {
            return Err(GatewayError::Publish {
                message_type: message.message_type().to_string(),
                message: "simulated failure".to_string(),
            });
        }

        self.published.write().await.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Incident, Mission};

    #[test]
    fn test_records_in_order_per_incident() {
        tokio_test::block_on(async {
            let publisher = MockMessagePublisher::new();
            publisher
                .publish(&OutboundMessage::IncidentAssignment(Mission::unassigned("a")))
                .await
                .unwrap();
            publisher
                .publish(&OutboundMessage::UpdateIncident(Incident::new("b")))
                .await
                .unwrap();
            publisher
                .publish(&OutboundMessage::CreateMission(Mission::assigned("a", "r")))
                .await
                .unwrap();

            assert_eq!(publisher.published().await.len(), 3);
            assert_eq!(
                publisher.types_for("a").await,
                vec![MessageType::IncidentAssignment, MessageType::CreateMission]
            );

            publisher.clear().await;
            assert!(publisher.published().await.is_empty());
        });
    }

    #[test]
    fn test_failure_not_recorded() {
        tokio_test::block_on(async {
            let publisher = MockMessagePublisher::new();
            publisher.set_fail(true).await;
            let result = publisher
                .publish(&OutboundMessage::UpdateIncident(Incident::new("a")))
                .await;
            assert!(matches!(result, Err(GatewayError::Publish { .. })));
            assert!(publisher.published().await.is_empty());
        });
    }
}
