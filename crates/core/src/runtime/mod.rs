//! Orchestration instance runtime.
//!
//! Hosts one saga instance per incident id:
//! - **Start**: rejects ids that are already active
//! - **Signals**: routed by incident id, one step at a time per instance
//! - **Timers**: a min-heap of retry deadlines polled by a background loop
//! - **Disposal**: terminal instances leave memory and, by default, the store

mod config;
mod runner;
mod timers;
mod types;

pub use config::RuntimeConfig;
pub use runner::{IncidentRuntime, WAIT_STATE_TYPES};
pub use timers::{TimerEntry, TimerQueue};
pub use types::{InstanceSnapshot, RuntimeError, RuntimeStatus, StartInstanceRequest};
