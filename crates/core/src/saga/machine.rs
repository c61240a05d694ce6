//! Incident lifecycle interpreter.
//!
//! `IncidentSaga` is stateless: every step takes the instance record by
//! mutable reference, runs to completion and leaves the record in its next
//! wait state. Callers serialize steps per instance.

use chrono::Utc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::audit::{AuditEvent, AuditHandle};
use crate::gateway::{Gateway, GatewayError, OutboundMessage, RuleSession};
use crate::metrics;
use crate::model::IncidentStatus;

use super::{CompletionOutcome, InstanceState, SagaError, Signal, SignalOutcome, WaitState};

/// Drives instance records through the assignment and mission lifecycle.
#[derive(Clone)]
pub struct IncidentSaga {
    pub(super) gateway: Gateway,
    pub(super) session: RuleSession,
    audit: Option<AuditHandle>,
}

impl IncidentSaga {
    pub fn new(gateway: Gateway, session: RuleSession) -> Self {
        Self {
            gateway,
            session,
            audit: None,
        }
    }

    /// Emit step-level audit events (priority, attempts, messages).
    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Fetch the priority and run the first assignment attempt.
    pub async fn start(&self, state: &mut InstanceState) -> Result<(), SagaError> {
        if state.attempts > 0 || state.wait != WaitState::Assigning {
            return Err(SagaError::AlreadyStarted(state.incident.id.clone()));
        }

        let result = self.attempt_assignment(state).await;
        self.settle(state, result)
    }

    /// Retry timer fired. Returns false if the instance was not waiting on it.
    ///
    /// An instance left in `Assigning` (interrupted mid-step) is also retried.
    pub async fn on_timer(&self, state: &mut InstanceState) -> Result<bool, SagaError> {
        if !matches!(
            state.wait,
            WaitState::RetryPending { .. } | WaitState::Assigning
        ) {
            return Ok(false);
        }

        let result = self.attempt_assignment(state).await;
        self.settle(state, result).map(|()| true)
    }

    /// Deliver a signal. Signals the current wait state does not accept are ignored.
    pub async fn on_signal(
        &self,
        state: &mut InstanceState,
        signal: Signal,
    ) -> Result<SignalOutcome, SagaError> {
        if !state.wait.accepts(&signal) {
            warn!(
                incident_id = %state.incident.id,
                signal = %signal,
                wait_state = state.wait.state_type(),
                "Ignoring signal not awaited in current state"
            );
            return Ok(SignalOutcome::Ignored);
        }

        let result = match signal {
            Signal::ResponderAvailable(true) => self.confirm_responder(state).await,
            Signal::ResponderAvailable(false) => self.decline_responder(state).await,
            Signal::MissionStarted => {
                self.advance(state, IncidentStatus::Assigned, WaitState::AwaitingPickup)
                    .await
            }
            Signal::VictimPickedUp => {
                self.advance(state, IncidentStatus::PickedUp, WaitState::AwaitingDelivery)
                    .await
            }
            Signal::VictimDelivered => {
                let done = completed(CompletionOutcome::Delivered);
                self.advance(state, IncidentStatus::Delivered, done).await
            }
            Signal::MissionAborted => {
                let done = completed(CompletionOutcome::Aborted);
                self.advance(state, IncidentStatus::Aborted, done).await
            }
        };

        self.settle(state, result).map(|()| SignalOutcome::Applied)
    }

    /// Set the incident status, broadcast it, then move to `next`.
    async fn advance(
        &self,
        state: &mut InstanceState,
        status: IncidentStatus,
        next: WaitState,
    ) -> Result<(), SagaError> {
        let previous = state.incident.status;
        state.incident.status = status;
        self.publish(state, OutboundMessage::UpdateIncident(state.incident.clone()))
            .await?;
        state.transition(next);

        info!(
            incident_id = %state.incident.id,
            from = %previous,
            to = %status,
            wait_state = state.wait.state_type(),
            "Incident status changed"
        );
        Ok(())
    }

    /// Publish one message, in order, through the gateway.
    pub(super) async fn publish(
        &self,
        state: &InstanceState,
        message: OutboundMessage,
    ) -> Result<(), GatewayError> {
        let message_type = message.message_type();
        let service = self.gateway.publisher.name().to_string();
        let started = Instant::now();
        let result = self.gateway.publisher.publish(&message).await;
        metrics::observe_external_call(&service, "publish", started, result.is_ok());
        result?;

        metrics::MESSAGES_PUBLISHED
            .with_label_values(&[message_type.as_str()])
            .inc();
        self.audit(AuditEvent::MessagePublished {
            incident_id: state.incident.id.clone(),
            message_type: message_type.to_string(),
        })
        .await;
        Ok(())
    }

    pub(super) async fn audit(&self, event: AuditEvent) {
        if let Some(ref audit_handle) = self.audit {
            audit_handle.emit(event).await;
        }
    }

    /// Move the record to `Failed` if the step errored.
    fn settle(&self, state: &mut InstanceState, result: Result<(), SagaError>) -> Result<(), SagaError> {
        if let Err(ref e) = result {
            error!(
                incident_id = %state.incident.id,
                attempts = state.attempts,
                error = %e,
                "Instance failed"
            );
            state.transition(WaitState::Failed {
                error: e.to_string(),
                failed_at: Utc::now(),
            });
        }
        result
    }
}

fn completed(outcome: CompletionOutcome) -> WaitState {
    WaitState::Completed {
        outcome,
        completed_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MessageType;
    use crate::model::{Mission, MissionStatus};
    use crate::saga::AssignmentDelay;
    use crate::testing::{fixtures, MockGateway};

    fn new_state(delay: &str) -> InstanceState {
        InstanceState::new(
            fixtures::incident("X"),
            fixtures::destinations(),
            AssignmentDelay::parse(delay).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_start_assigned_reserves_responder() {
        let mock = MockGateway::new();
        mock.rules
            .push_decision(fixtures::assigned_mission("X", "R1"))
            .await;
        let saga = IncidentSaga::new(mock.gateway(), RuleSession::default());
        let mut state = new_state("PT60S");

        saga.start(&mut state).await.unwrap();

        assert_eq!(state.wait, WaitState::AwaitingResponderAvailable);
        assert_eq!(state.attempts, 1);
        let published = mock.publisher.published().await;
        assert_eq!(published.len(), 1);
        let mission = published[0].mission().unwrap();
        assert_eq!(published[0].message_type(), MessageType::SetResponderUnavailable);
        assert_eq!(mission.status, MissionStatus::Assigned);
        assert_eq!(mission.incident_id, "X");
        assert_eq!(mission.responder_id.as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_start_sends_requested_mission_and_session() {
        let mock = MockGateway::new();
        let session = RuleSession {
            name: "test-session".to_string(),
            ..RuleSession::default()
        };
        let saga = IncidentSaga::new(mock.gateway(), session);
        let mut state = new_state("PT60S");

        saga.start(&mut state).await.unwrap();

        let requests = mock.rules.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].mission, Mission::requested("X"));
        assert_eq!(requests[0].session.name, "test-session");
        assert_eq!(requests[0].priority.incident_id, "X");
        assert_eq!(requests[0].destinations, fixtures::destinations());
    }

    #[tokio::test]
    async fn test_start_unassigned_arms_retry() {
        let mock = MockGateway::new();
        let saga = IncidentSaga::new(mock.gateway(), RuleSession::default());
        let mut state = new_state("PT60S");

        let before = Utc::now();
        saga.start(&mut state).await.unwrap();

        let retry_at = state.wait.retry_at().expect("retry pending");
        assert!(retry_at >= before + chrono::Duration::seconds(60));
        assert_eq!(state.mission, Some(Mission::unassigned("X")));

        let published = mock.publisher.published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].message_type(), MessageType::IncidentAssignment);
        assert_eq!(
            published[0].mission().unwrap().status,
            MissionStatus::Unassigned
        );
    }

    #[tokio::test]
    async fn test_start_twice_rejected() {
        let mock = MockGateway::new();
        let saga = IncidentSaga::new(mock.gateway(), RuleSession::default());
        let mut state = new_state("PT60S");
        saga.start(&mut state).await.unwrap();

        let result = saga.start(&mut state).await;
        assert!(matches!(result, Err(SagaError::AlreadyStarted(_))));
    }

    #[tokio::test]
    async fn test_gateway_failure_fails_instance() {
        let mock = MockGateway::new();
        mock.responders.set_fail(true).await;
        let saga = IncidentSaga::new(mock.gateway(), RuleSession::default());
        let mut state = new_state("PT60S");

        let result = saga.start(&mut state).await;

        assert!(matches!(result, Err(SagaError::Gateway(_))));
        assert!(matches!(state.wait, WaitState::Failed { .. }));
        assert!(mock.publisher.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_decision_fails_instance() {
        let mock = MockGateway::new();
        let mut bogus = Mission::requested("X");
        bogus.status = MissionStatus::Assigned;
        mock.rules.push_decision(bogus).await;
        let saga = IncidentSaga::new(mock.gateway(), RuleSession::default());
        let mut state = new_state("PT60S");

        let result = saga.start(&mut state).await;

        assert!(matches!(
            result,
            Err(SagaError::Gateway(GatewayError::InvalidDecision { .. }))
        ));
        assert!(state.is_terminal());
    }

    #[tokio::test]
    async fn test_publish_failure_fails_instance() {
        let mock = MockGateway::new();
        mock.rules
            .push_decision(fixtures::assigned_mission("X", "R1"))
            .await;
        mock.publisher.set_fail(true).await;
        let saga = IncidentSaga::new(mock.gateway(), RuleSession::default());
        let mut state = new_state("PT60S");

        assert!(saga.start(&mut state).await.is_err());
        assert!(matches!(state.wait, WaitState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_on_timer_ignored_outside_retry() {
        let mock = MockGateway::new();
        mock.rules
            .push_decision(fixtures::assigned_mission("X", "R1"))
            .await;
        let saga = IncidentSaga::new(mock.gateway(), RuleSession::default());
        let mut state = new_state("PT60S");
        saga.start(&mut state).await.unwrap();

        assert!(!saga.on_timer(&mut state).await.unwrap());
        assert_eq!(mock.responders.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_decline_then_timer_retries() {
        let mock = MockGateway::new();
        mock.rules
            .push_decision(fixtures::assigned_mission("X", "R1"))
            .await;
        mock.rules
            .push_decision(fixtures::assigned_mission("X", "R2"))
            .await;
        let saga = IncidentSaga::new(mock.gateway(), RuleSession::default());
        let mut state = new_state("PT1S");
        saga.start(&mut state).await.unwrap();

        let outcome = saga
            .on_signal(&mut state, Signal::ResponderAvailable(false))
            .await
            .unwrap();
        assert_eq!(outcome, SignalOutcome::Applied);
        assert!(matches!(state.wait, WaitState::RetryPending { .. }));
        assert_eq!(mock.responders.call_count().await, 1);

        assert!(saga.on_timer(&mut state).await.unwrap());
        assert_eq!(state.wait, WaitState::AwaitingResponderAvailable);
        assert_eq!(state.attempts, 2);
        assert_eq!(mock.responders.call_count().await, 2);
        assert_eq!(mock.priority.call_count().await, 1);

        let types: Vec<MessageType> = mock
            .publisher
            .published()
            .await
            .iter()
            .map(|m| m.message_type())
            .collect();
        assert_eq!(
            types,
            vec![
                MessageType::SetResponderUnavailable,
                MessageType::IncidentAssignment,
                MessageType::SetResponderUnavailable,
            ]
        );
    }

    #[tokio::test]
    async fn test_out_of_order_signal_ignored() {
        let mock = MockGateway::new();
        mock.rules
            .push_decision(fixtures::assigned_mission("X", "R1"))
            .await;
        let saga = IncidentSaga::new(mock.gateway(), RuleSession::default());
        let mut state = new_state("PT60S");
        saga.start(&mut state).await.unwrap();
        saga.on_signal(&mut state, Signal::ResponderAvailable(true))
            .await
            .unwrap();

        let outcome = saga
            .on_signal(&mut state, Signal::VictimPickedUp)
            .await
            .unwrap();

        assert_eq!(outcome, SignalOutcome::Ignored);
        assert_eq!(state.wait, WaitState::AwaitingMissionStarted);
        assert_eq!(state.incident.status, IncidentStatus::Requested);
        assert_eq!(mock.publisher.published().await.len(), 3);
    }

    #[tokio::test]
    async fn test_abort_from_pickup_completes() {
        let mock = MockGateway::new();
        mock.rules
            .push_decision(fixtures::assigned_mission("X", "R1"))
            .await;
        let saga = IncidentSaga::new(mock.gateway(), RuleSession::default());
        let mut state = new_state("PT60S");
        saga.start(&mut state).await.unwrap();
        for signal in [
            Signal::ResponderAvailable(true),
            Signal::MissionStarted,
            Signal::VictimPickedUp,
            Signal::MissionAborted,
        ] {
            assert_eq!(
                saga.on_signal(&mut state, signal).await.unwrap(),
                SignalOutcome::Applied
            );
        }

        assert_eq!(state.incident.status, IncidentStatus::Aborted);
        assert!(matches!(
            state.wait,
            WaitState::Completed {
                outcome: CompletionOutcome::Aborted,
                ..
            }
        ));
        // terminal instances accept nothing
        assert_eq!(
            saga.on_signal(&mut state, Signal::VictimDelivered)
                .await
                .unwrap(),
            SignalOutcome::Ignored
        );
    }
}
