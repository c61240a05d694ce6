//! Mock assignment rules for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::gateway::{AssignmentRequest, AssignmentRules, GatewayError};
use crate::model::Mission;

type Decider = dyn Fn(&AssignmentRequest) -> Mission + Send + Sync;

/// Mock implementation of the AssignmentRules trait.
///
/// Decisions come from, in order of precedence:
/// 1. the queue filled by `push_decision`
/// 2. the decider closure set with `set_decider`
/// 3. an unassigned mission for the requested incident
///
/// Every request is recorded so tests can inspect what the saga sent.
pub struct MockAssignmentRules {
    decisions: Arc<RwLock<VecDeque<Mission>>>,
    decider: Arc<RwLock<Option<Box<Decider>>>>,
    requests: Arc<RwLock<Vec<AssignmentRequest>>>,
    fail: Arc<RwLock<bool>>,
}

impl std::fmt::Debug for MockAssignmentRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAssignmentRules")
            .field("decisions", &"<decisions>")
            .field("decider", &"<decider>")
            .field("requests", &"<requests>")
            .finish()
    }
}

impl Default for MockAssignmentRules {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAssignmentRules {
    pub fn new() -> Self {
        Self {
            decisions: Arc::new(RwLock::new(VecDeque::new())),
            decider: Arc::new(RwLock::new(None)),
            requests: Arc::new(RwLock::new(Vec::new())),
            fail: Arc::new(RwLock::new(false)),
        }
    }

    /// Queue a decision for the next evaluation.
    pub async fn push_decision(&self, mission: Mission) {
        self.decisions.write().await.push_back(mission);
    }

    /// Decide with a closure whenever the queue is empty.
    pub async fn set_decider<F>(&self, decider: F)
    where
        F: Fn(&AssignmentRequest) -> Mission + Send + Sync + 'static,
    {
        *self.decider.write().await = Some(Box::new(decider));
    }

    /// Assign every incident to the given responder.
    pub async fn always_assign(&self, responder_id: &str) {
        let responder_id = responder_id.to_string();
        self.set_decider(move |request| {
            super::fixtures::assigned_mission(&request.incident.id, &responder_id)
        })
        .await;
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    /// All evaluation requests, in call order.
    pub async fn requests(&self) -> Vec<AssignmentRequest> {
        self.requests.read().await.clone()
    }

    /// Evaluations made for one incident.
    pub async fn calls_for(&self, incident_id: &str) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.incident.id == incident_id)
            .count()
    }
}

#[async_trait]
impl AssignmentRules for MockAssignmentRules {
    fn name(&self) -> &str {
        "mock-rules"
    }

    async fn evaluate(&self, request: AssignmentRequest) -> Result<Mission, GatewayError> {
        self.requests.write().await.push(request.clone());

        if *self.fail.read().await {
            return Err(GatewayError::Http {
                service: "mock-rules",
                status: 500,
            });
        }

        if let Some(mission) = self.decisions.write().await.pop_front() {
            return Ok(mission);
        }

        if let Some(ref decider) = *self.decider.read().await {
            return Ok(decider(&request));
        }

        Ok(Mission::unassigned(request.incident.id.as_str()))
    }
}
