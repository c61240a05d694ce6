//! Instance storage trait and types.

use thiserror::Error;

use crate::saga::InstanceState;

/// Error type for instance storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Filter for listing stored instances.
#[derive(Debug, Clone, Default)]
pub struct InstanceFilter {
    /// Filter by wait-state type (e.g. "retry_pending").
    pub wait_state: Option<String>,
    /// Exclude completed and failed instances.
    pub active_only: bool,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl InstanceFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    /// Filter by wait-state type.
    pub fn with_wait_state(mut self, wait_state: impl Into<String>) -> Self {
        self.wait_state = Some(wait_state.into());
        self
    }

    /// Only non-terminal instances.
    pub fn active(mut self) -> Self {
        self.active_only = true;
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for instance storage backends.
///
/// Records are keyed by incident id. Implementations are called from async
/// code while a per-instance lock is held, so they should be quick.
pub trait InstanceStore: Send + Sync {
    /// Insert or replace the record for `state.incident.id`.
    fn save(&self, state: &InstanceState) -> Result<(), StoreError>;

    /// Get a record by incident id.
    fn get(&self, incident_id: &str) -> Result<Option<InstanceState>, StoreError>;

    /// List records matching the filter, oldest first.
    fn list(&self, filter: &InstanceFilter) -> Result<Vec<InstanceState>, StoreError>;

    /// Count records matching the filter.
    fn count(&self, filter: &InstanceFilter) -> Result<i64, StoreError>;

    /// Delete a record. Returns true if one existed.
    fn delete(&self, incident_id: &str) -> Result<bool, StoreError>;
}
