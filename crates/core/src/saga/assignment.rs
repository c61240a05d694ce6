//! Mission assignment sub-process.
//!
//! One attempt fetches responders, asks the decision service for a mission and
//! either reserves the proposed responder or arms the retry timer. Retries are
//! unbounded; only the timer drives them.

use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{debug, info};

use crate::audit::AuditEvent;
use crate::gateway::{normalize_decision, AssignmentRequest, GatewayError, OutboundMessage};
use crate::metrics;
use crate::model::{IncidentPriority, Mission, MissionStatus};

use super::{IncidentSaga, InstanceState, SagaError, WaitState};

impl IncidentSaga {
    /// Return the cached priority, fetching it on first use.
    pub(super) async fn ensure_priority(
        &self,
        state: &mut InstanceState,
    ) -> Result<IncidentPriority, GatewayError> {
        if let Some(ref priority) = state.priority {
            return Ok(priority.clone());
        }

        let service = self.gateway.priority.name().to_string();
        let started = Instant::now();
        let result = self.gateway.priority.fetch_priority(&state.incident).await;
        metrics::observe_external_call(&service, "fetch_priority", started, result.is_ok());
        let priority = result?;

        debug!(
            incident_id = %state.incident.id,
            priority = priority.priority,
            escalated = priority.escalated,
            "Fetched incident priority"
        );
        self.audit(AuditEvent::PriorityFetched {
            incident_id: state.incident.id.clone(),
            priority: priority.priority,
            escalated: priority.escalated,
        })
        .await;

        state.priority = Some(priority.clone());
        Ok(priority)
    }

    /// Run one assignment attempt.
    pub(super) async fn attempt_assignment(
        &self,
        state: &mut InstanceState,
    ) -> Result<(), SagaError> {
        let result = self.run_attempt(state).await;
        if result.is_err() {
            metrics::ASSIGNMENT_ATTEMPTS
                .with_label_values(&["error"])
                .inc();
        }
        result
    }

    async fn run_attempt(&self, state: &mut InstanceState) -> Result<(), SagaError> {
        let priority = self.ensure_priority(state).await?;

        state.transition(WaitState::Assigning);
        state.attempts += 1;
        let incident_id = state.incident.id.clone();

        let service = self.gateway.responders.name().to_string();
        let started = Instant::now();
        let result = self.gateway.responders.fetch_responders().await;
        metrics::observe_external_call(&service, "fetch_responders", started, result.is_ok());
        let responders = result?;
        let responder_count = responders.len();

        let requested = Mission::requested(incident_id.as_str());
        state.mission = Some(requested.clone());

        let request = AssignmentRequest {
            session: self.session.clone(),
            incident: state.incident.clone(),
            destinations: state.destinations.clone(),
            responders,
            priority,
            mission: requested,
        };

        let service = self.gateway.rules.name().to_string();
        let started = Instant::now();
        let result = self.gateway.rules.evaluate(request).await;
        metrics::observe_external_call(&service, "evaluate", started, result.is_ok());
        let mission = normalize_decision(&incident_id, result?)?;

        let assigned = mission.is_assigned();
        metrics::ASSIGNMENT_ATTEMPTS
            .with_label_values(&[if assigned { "assigned" } else { "unassigned" }])
            .inc();
        self.audit(AuditEvent::AssignmentAttempted {
            incident_id: incident_id.clone(),
            attempt: state.attempts,
            responders: responder_count,
            mission_status: mission_status_name(mission.status).to_string(),
            responder_id: mission.responder_id.clone(),
        })
        .await;

        if assigned {
            info!(
                incident_id = %incident_id,
                attempt = state.attempts,
                responder_id = mission.responder_id.as_deref().unwrap_or_default(),
                "Responder proposed, awaiting availability"
            );
            state.mission = Some(mission.clone());
            self.publish(state, OutboundMessage::SetResponderUnavailable(mission))
                .await?;
            state.transition(WaitState::AwaitingResponderAvailable);
            Ok(())
        } else {
            info!(
                incident_id = %incident_id,
                attempt = state.attempts,
                responders = responder_count,
                "No responder assigned"
            );
            self.arm_retry(state, mission).await
        }
    }

    /// Confirmed responder: announce the assignment and ask for the mission.
    pub(super) async fn confirm_responder(
        &self,
        state: &mut InstanceState,
    ) -> Result<(), SagaError> {
        let mission = match state.mission {
            Some(ref mission) if mission.is_assigned() => mission.clone(),
            _ => return Err(SagaError::MissingMission(state.incident.id.clone())),
        };

        info!(
            incident_id = %state.incident.id,
            responder_id = mission.responder_id.as_deref().unwrap_or_default(),
            "Responder confirmed availability"
        );
        self.publish(state, OutboundMessage::IncidentAssignment(mission.clone()))
            .await?;
        self.publish(state, OutboundMessage::CreateMission(mission))
            .await?;
        state.transition(WaitState::AwaitingMissionStarted);
        Ok(())
    }

    /// Declined responder: publish an unassigned outcome and wait for the timer.
    ///
    /// The next attempt runs only when the retry timer fires.
    pub(super) async fn decline_responder(
        &self,
        state: &mut InstanceState,
    ) -> Result<(), SagaError> {
        info!(
            incident_id = %state.incident.id,
            responder_id = state
                .mission
                .as_ref()
                .and_then(|m| m.responder_id.as_deref())
                .unwrap_or_default(),
            "Responder declined"
        );
        let unassigned = Mission::unassigned(state.incident.id.as_str());
        self.arm_retry(state, unassigned).await
    }

    async fn arm_retry(&self, state: &mut InstanceState, mission: Mission) -> Result<(), SagaError> {
        state.mission = Some(mission.clone());
        self.publish(state, OutboundMessage::IncidentAssignment(mission))
            .await?;

        let retry_at = Utc::now()
            .checked_add_signed(state.assignment_delay.to_chrono())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        debug!(
            incident_id = %state.incident.id,
            delay = %state.assignment_delay,
            retry_at = %retry_at,
            "Retry timer armed"
        );
        state.transition(WaitState::RetryPending { retry_at });
        Ok(())
    }
}

fn mission_status_name(status: MissionStatus) -> &'static str {
    match status {
        MissionStatus::Requested => "REQUESTED",
        MissionStatus::Assigned => "ASSIGNED",
        MissionStatus::Unassigned => "UNASSIGNED",
    }
}
