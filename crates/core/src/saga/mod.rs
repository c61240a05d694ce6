//! Incident saga: mission assignment with timer-driven retry, then the
//! mission lifecycle driven by external signals.
//!
//! The saga is a small interpreter over an explicit, serializable
//! [`InstanceState`]; suspension is just a [`WaitState`] on that record.

mod assignment;
mod duration;
mod machine;
mod types;

pub use duration::{AssignmentDelay, DurationError};
pub use machine::IncidentSaga;
pub use types::{
    CompletionOutcome, InstanceState, SagaError, Signal, SignalError, SignalOutcome, WaitState,
};
