//! Incident runtime implementation.
//!
//! Instances live in a map keyed by incident id, each behind its own async
//! mutex so steps of one instance never overlap while distinct instances run
//! concurrently. The store is written after every step; it is the source for
//! inspection and for recovery after a restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditEvent, AuditHandle};
use crate::instance::{InstanceFilter, InstanceStore};
use crate::metrics;
use crate::saga::{
    AssignmentDelay, CompletionOutcome, IncidentSaga, InstanceState, SagaError, Signal,
    SignalError, SignalOutcome, WaitState,
};

use super::config::RuntimeConfig;
use super::timers::{TimerEntry, TimerQueue};
use super::types::{InstanceSnapshot, RuntimeError, RuntimeStatus, StartInstanceRequest};

type InstanceSlot = Arc<Mutex<InstanceState>>;

const RECOVERY_PAGE_SIZE: i64 = 100;

/// Every wait state name, in lifecycle order.
pub const WAIT_STATE_TYPES: &[&str] = &[
    "assigning",
    "retry_pending",
    "awaiting_responder_available",
    "awaiting_mission_started",
    "awaiting_pickup",
    "awaiting_delivery",
    "completed",
    "failed",
];

/// Handles shared between the public API and the timer loop.
#[derive(Clone)]
struct RuntimeCore {
    saga: IncidentSaga,
    store: Arc<dyn InstanceStore>,
    audit: Option<AuditHandle>,
    instances: Arc<RwLock<HashMap<String, InstanceSlot>>>,
    timers: Arc<Mutex<TimerQueue>>,
    retain_completed: bool,
}

impl RuntimeCore {
    async fn slot(&self, incident_id: &str) -> Option<InstanceSlot> {
        self.instances.read().await.get(incident_id).cloned()
    }

    async fn audit(&self, event: AuditEvent) {
        if let Some(ref audit_handle) = self.audit {
            audit_handle.emit(event).await;
        }
    }

    /// Persist, re-arm or dispose of an instance after a step.
    ///
    /// Must be called with the instance lock held. A step error is returned
    /// after the failed record has been handled.
    async fn after_step(
        &self,
        state: &InstanceState,
        from_state: &'static str,
        result: Result<(), SagaError>,
    ) -> Result<(), RuntimeError> {
        let to_state = state.wait.state_type();
        debug!(
            incident_id = %state.incident.id,
            from = from_state,
            to = to_state,
            attempts = state.attempts,
            "Instance step finished"
        );
        self.audit(AuditEvent::WaitStateChanged {
            incident_id: state.incident.id.clone(),
            from_state: from_state.to_string(),
            to_state: to_state.to_string(),
        })
        .await;

        if let WaitState::RetryPending { retry_at } = state.wait {
            self.timers.lock().await.schedule(TimerEntry {
                due: retry_at,
                incident_id: state.incident.id.clone(),
                attempt: state.attempts,
            });
        }

        let persisted = if state.is_terminal() {
            self.finish(state).await
        } else {
            self.store.save(state).map_err(RuntimeError::from)
        };

        result?;
        persisted
    }

    /// Dispose of a terminal instance.
    async fn finish(&self, state: &InstanceState) -> Result<(), RuntimeError> {
        self.instances.write().await.remove(state.id());
        metrics::ACTIVE_INSTANCES.dec();

        let outcome = match state.wait {
            WaitState::Completed {
                outcome: CompletionOutcome::Delivered,
                ..
            } => "delivered",
            WaitState::Completed {
                outcome: CompletionOutcome::Aborted,
                ..
            } => "aborted",
            _ => "failed",
        };
        let lifetime = (state.updated_at - state.created_at).num_milliseconds() as f64 / 1000.0;
        metrics::INSTANCES_FINISHED
            .with_label_values(&[outcome])
            .inc();
        metrics::INSTANCE_DURATION
            .with_label_values(&[outcome])
            .observe(lifetime.max(0.0));

        if let WaitState::Failed { ref error, .. } = state.wait {
            self.audit(AuditEvent::InstanceFailed {
                incident_id: state.incident.id.clone(),
                error: error.clone(),
                attempts: state.attempts,
            })
            .await;
        } else {
            info!(
                incident_id = %state.incident.id,
                outcome,
                attempts = state.attempts,
                "Instance completed"
            );
            self.audit(AuditEvent::InstanceCompleted {
                incident_id: state.incident.id.clone(),
                outcome: outcome.to_string(),
                attempts: state.attempts,
            })
            .await;
        }

        if self.retain_completed {
            self.store.save(state)?;
        } else {
            self.store.delete(state.id())?;
        }
        Ok(())
    }

    /// Fire one timer. Returns false if the timer was stale.
    async fn fire_timer(&self, entry: TimerEntry) -> bool {
        let Some(slot) = self.slot(&entry.incident_id).await else {
            debug!(incident_id = %entry.incident_id, "Dropping timer for disposed instance");
            return false;
        };

        let mut state = slot.lock().await;
        let armed = matches!(
            state.wait,
            WaitState::RetryPending { .. } | WaitState::Assigning
        );
        if !armed || state.attempts != entry.attempt {
            debug!(
                incident_id = %entry.incident_id,
                timer_attempt = entry.attempt,
                attempts = state.attempts,
                wait_state = state.wait.state_type(),
                "Dropping stale timer"
            );
            return false;
        }

        metrics::TIMERS_FIRED.inc();
        info!(
            incident_id = %entry.incident_id,
            attempt = state.attempts + 1,
            "Retry timer fired"
        );

        let from_state = state.wait.state_type();
        let result = self.saga.on_timer(&mut state).await.map(|_| ());
        if let Err(e) = self.after_step(&state, from_state, result).await {
            warn!(incident_id = %entry.incident_id, "Retry attempt failed: {}", e);
        }
        true
    }

    async fn run_due_timers(&self, now: DateTime<Utc>) -> usize {
        let due = self.timers.lock().await.pop_due(now);
        if due.is_empty() {
            return 0;
        }

        join_all(due.into_iter().map(|entry| self.fire_timer(entry)))
            .await
            .into_iter()
            .filter(|fired| *fired)
            .count()
    }
}

/// The incident runtime: starts instances, routes signals and fires timers.
pub struct IncidentRuntime {
    config: RuntimeConfig,
    core: RuntimeCore,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    timer_task: Mutex<Option<JoinHandle<()>>>,
}

impl IncidentRuntime {
    /// Create a new runtime.
    pub fn new(
        config: RuntimeConfig,
        saga: IncidentSaga,
        store: Arc<dyn InstanceStore>,
        audit: Option<AuditHandle>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let retain_completed = config.retain_completed;

        Self {
            config,
            core: RuntimeCore {
                saga,
                store,
                audit,
                instances: Arc::new(RwLock::new(HashMap::new())),
                timers: Arc::new(Mutex::new(TimerQueue::new())),
                retain_completed,
            },
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            timer_task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Recover stored instances and spawn the timer loop.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Runtime already running");
            return;
        }

        info!("Starting incident runtime");

        if let Err(e) = self.recover().await {
            error!("Instance recovery failed: {}", e);
        }

        self.spawn_timer_loop().await;

        info!("Incident runtime started");
    }

    /// Stop the timer loop, letting an in-flight step finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Runtime not running");
            return;
        }

        info!("Stopping incident runtime");

        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.timer_task.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Timer loop ended abnormally: {}", e);
            }
        }

        info!("Incident runtime stopped");
    }

    async fn spawn_timer_loop(&self) {
        let core = self.core.clone();
        let running = Arc::clone(&self.running);
        let tick = Duration::from_millis(self.config.timer_tick_ms.max(1));
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!("Timer loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Timer loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(tick) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        let fired = core.run_due_timers(Utc::now()).await;
                        if fired > 0 {
                            debug!(fired, "Fired retry timers");
                        }
                    }
                }
            }
            info!("Timer loop stopped");
        });

        *self.timer_task.lock().await = Some(handle);
    }

    /// Start an instance for a new incident and run its first attempt.
    ///
    /// Returns the instance as it stands once the first attempt has finished.
    pub async fn start_instance(
        &self,
        request: StartInstanceRequest,
    ) -> Result<InstanceSnapshot, RuntimeError> {
        let incident_id = request.incident.id.clone();
        if incident_id.trim().is_empty() {
            return Err(RuntimeError::InvalidIncident(
                "incident id is required".to_string(),
            ));
        }

        let raw_delay = request
            .assignment_delay
            .as_deref()
            .unwrap_or(&self.config.default_assignment_delay);
        let delay = AssignmentDelay::parse(raw_delay)?;

        if let Some(existing) = self.core.store.get(&incident_id)? {
            if !existing.is_terminal() {
                return Err(RuntimeError::AlreadyActive(incident_id));
            }
        }

        let destinations = request.destinations.len();
        let slot = Arc::new(Mutex::new(InstanceState::new(
            request.incident,
            request.destinations,
            delay,
        )));

        let mut state = {
            let mut instances = self.core.instances.write().await;
            if instances.contains_key(&incident_id) {
                return Err(RuntimeError::AlreadyActive(incident_id));
            }
            let guard = Arc::clone(&slot).lock_owned().await;
            instances.insert(incident_id.clone(), slot);
            guard
        };

        metrics::INSTANCES_STARTED.inc();
        metrics::ACTIVE_INSTANCES.inc();
        info!(
            incident_id = %incident_id,
            delay = %state.assignment_delay,
            destinations,
            "Starting incident instance"
        );
        self.core
            .audit(AuditEvent::InstanceStarted {
                incident_id: incident_id.clone(),
                assignment_delay: state.assignment_delay.to_string(),
                destinations,
            })
            .await;

        if let Err(e) = self.core.store.save(&state) {
            self.core.instances.write().await.remove(&incident_id);
            metrics::ACTIVE_INSTANCES.dec();
            return Err(e.into());
        }

        let from_state = state.wait.state_type();
        let result = self.core.saga.start(&mut state).await;
        let snapshot = InstanceSnapshot::from(&*state);
        self.core.after_step(&state, from_state, result).await?;

        Ok(snapshot)
    }

    /// Deliver a signal to the instance for `incident_id`.
    pub async fn signal(
        &self,
        incident_id: &str,
        signal: Signal,
    ) -> Result<SignalOutcome, RuntimeError> {
        let slot = self
            .core
            .slot(incident_id)
            .await
            .ok_or_else(|| RuntimeError::InstanceNotFound(incident_id.to_string()))?;

        let mut state = slot.lock().await;
        let from_state = state.wait.state_type();

        match self.core.saga.on_signal(&mut state, signal).await {
            Ok(SignalOutcome::Ignored) => {
                metrics::SIGNALS_TOTAL
                    .with_label_values(&[signal.name(), "ignored"])
                    .inc();
                self.core
                    .audit(AuditEvent::SignalIgnored {
                        incident_id: incident_id.to_string(),
                        signal: signal.to_string(),
                        wait_state: from_state.to_string(),
                    })
                    .await;
                Ok(SignalOutcome::Ignored)
            }
            Ok(SignalOutcome::Applied) => {
                metrics::SIGNALS_TOTAL
                    .with_label_values(&[signal.name(), "applied"])
                    .inc();
                info!(incident_id, signal = %signal, "Signal applied");
                self.core
                    .audit(AuditEvent::SignalApplied {
                        incident_id: incident_id.to_string(),
                        signal: signal.to_string(),
                    })
                    .await;
                self.core.after_step(&state, from_state, Ok(())).await?;
                Ok(SignalOutcome::Applied)
            }
            Err(e) => {
                metrics::SIGNALS_TOTAL
                    .with_label_values(&[signal.name(), "failed"])
                    .inc();
                self.core
                    .after_step(&state, from_state, Err(e))
                    .await
                    .map(|()| SignalOutcome::Applied)
            }
        }
    }

    /// Parse a signal from its wire form and deliver it.
    ///
    /// Malformed signals are rejected without touching the instance.
    pub async fn deliver(
        &self,
        incident_id: &str,
        name: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<SignalOutcome, RuntimeError> {
        if self.core.slot(incident_id).await.is_none() {
            return Err(RuntimeError::InstanceNotFound(incident_id.to_string()));
        }

        match Signal::parse(name, payload) {
            Ok(signal) => self.signal(incident_id, signal).await,
            Err(e) => {
                warn!(incident_id, signal = name, "Rejecting malformed signal: {}", e);
                let label = match e {
                    SignalError::UnknownSignal(_) => "unknown",
                    SignalError::InvalidPayload { signal, .. } => signal,
                };
                metrics::SIGNALS_TOTAL
                    .with_label_values(&[label, "rejected"])
                    .inc();
                self.core
                    .audit(AuditEvent::SignalRejected {
                        incident_id: incident_id.to_string(),
                        signal: name.to_string(),
                        reason: e.to_string(),
                    })
                    .await;
                Err(e.into())
            }
        }
    }

    /// Fire every timer due at `now`. Returns the number that fired.
    ///
    /// The timer loop calls this on every tick.
    pub async fn run_due_timers(&self, now: DateTime<Utc>) -> usize {
        self.core.run_due_timers(now).await
    }

    /// Get an instance by incident id, as last persisted.
    pub async fn instance(
        &self,
        incident_id: &str,
    ) -> Result<Option<InstanceSnapshot>, RuntimeError> {
        Ok(self
            .core
            .store
            .get(incident_id)?
            .as_ref()
            .map(InstanceSnapshot::from))
    }

    /// List stored instances.
    pub async fn list(&self, filter: &InstanceFilter) -> Result<Vec<InstanceSnapshot>, RuntimeError> {
        Ok(self
            .core
            .store
            .list(filter)?
            .iter()
            .map(InstanceSnapshot::from)
            .collect())
    }

    /// Count stored instances matching a filter, ignoring pagination.
    pub async fn count(&self, filter: &InstanceFilter) -> Result<i64, RuntimeError> {
        Ok(self.core.store.count(filter)?)
    }

    /// Get current runtime status.
    pub async fn status(&self) -> RuntimeStatus {
        let active_instances = self.core.instances.read().await.len();
        let (pending_timers, next_timer_due) = {
            let timers = self.core.timers.lock().await;
            (timers.len(), timers.next_due())
        };

        let mut by_wait_state = BTreeMap::new();
        for wait_state in WAIT_STATE_TYPES {
            let count = self
                .core
                .store
                .count(&InstanceFilter::new().with_wait_state(*wait_state))
                .unwrap_or(0) as usize;
            if count > 0 {
                by_wait_state.insert(wait_state.to_string(), count);
            }
        }

        RuntimeStatus {
            running: self.is_running(),
            active_instances,
            pending_timers,
            next_timer_due,
            by_wait_state,
        }
    }

    /// Load non-terminal instances from the store and re-arm their timers.
    ///
    /// Instances persisted mid-attempt are retried on the next tick.
    pub async fn recover(&self) -> Result<usize, RuntimeError> {
        let mut recovered = 0;
        let mut offset = 0;

        loop {
            let page = self.core.store.list(
                &InstanceFilter::new()
                    .active()
                    .with_limit(RECOVERY_PAGE_SIZE)
                    .with_offset(offset),
            )?;
            let page_len = page.len() as i64;

            for state in page {
                if self.adopt(state).await {
                    recovered += 1;
                }
            }

            if page_len < RECOVERY_PAGE_SIZE {
                break;
            }
            offset += page_len;
        }

        if recovered > 0 {
            info!(count = recovered, "Recovered suspended instances");
        }
        self.core
            .audit(AuditEvent::InstancesRecovered { count: recovered })
            .await;

        Ok(recovered)
    }

    async fn adopt(&self, state: InstanceState) -> bool {
        let incident_id = state.id().to_string();
        let wait_state = state.wait.state_type();
        let attempt = state.attempts;
        let due = match state.wait {
            WaitState::RetryPending { retry_at } => Some(retry_at),
            WaitState::Assigning => Some(Utc::now()),
            _ => None,
        };

        {
            let mut instances = self.core.instances.write().await;
            if instances.contains_key(&incident_id) {
                return false;
            }
            instances.insert(incident_id.clone(), Arc::new(Mutex::new(state)));
        }
        metrics::ACTIVE_INSTANCES.inc();

        if let Some(due) = due {
            self.core.timers.lock().await.schedule(TimerEntry {
                due,
                incident_id: incident_id.clone(),
                attempt,
            });
        }

        debug!(incident_id = %incident_id, wait_state, "Recovered instance");
        true
    }
}
