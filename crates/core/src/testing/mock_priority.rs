//! Mock priority service for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::gateway::{GatewayError, PriorityService};
use crate::model::{Incident, IncidentPriority};

/// Mock implementation of the PriorityService trait.
///
/// Answers with a fixed priority level for any incident and records which
/// incidents were looked up.
pub struct MockPriorityService {
    level: Arc<RwLock<i64>>,
    lookups: Arc<RwLock<Vec<String>>>,
    fail: Arc<RwLock<bool>>,
}

impl std::fmt::Debug for MockPriorityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPriorityService")
            .field("lookups", &"<lookups>")
            .finish()
    }
}

impl Default for MockPriorityService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPriorityService {
    pub fn new() -> Self {
        Self {
            level: Arc::new(RwLock::new(1)),
            lookups: Arc::new(RwLock::new(Vec::new())),
            fail: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn set_level(&self, level: i64) {
        *self.level.write().await = level;
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    /// Incident ids looked up, in call order.
    pub async fn lookups(&self) -> Vec<String> {
        self.lookups.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.lookups.read().await.len()
    }

    /// Lookups made for one incident.
    pub async fn calls_for(&self, incident_id: &str) -> usize {
        self.lookups
            .read()
            .await
            .iter()
            .filter(|id| *id == incident_id)
            .count()
    }
}

#[async_trait]
impl PriorityService for MockPriorityService {
    fn name(&self) -> &str {
        "mock-priority"
    }

    async fn fetch_priority(&self, incident: &Incident) -> Result<IncidentPriority, GatewayError> {
        self.lookups.write().await.push(incident.id.clone());

        if *self.fail.read().await {
            return Err(GatewayError::Http {
                service: "mock-priority",
                status: 503,
            });
        }

        Ok(IncidentPriority::new(
            incident.id.as_str(),
            *self.level.read().await,
        ))
    }
}
