use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{AuditCategory, AuditRecord};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Selects a slice of the audit trail.
///
/// Records come back in emission order. Readers tail a timeline by passing
/// the id of the last record they saw as `after_id`.
#[derive(Debug, Clone)]
pub struct AuditFilter {
    pub incident_id: Option<String>,
    pub category: Option<AuditCategory>,
    pub event_type: Option<String>,
    /// Only records with a larger id.
    pub after_id: Option<i64>,
    /// Only records emitted at or after this instant.
    pub since: Option<DateTime<Utc>>,
    pub limit: i64,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            incident_id: None,
            category: None,
            event_type: None,
            after_id: None,
            since: None,
            limit: 100,
        }
    }
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeline of a single incident.
    pub fn for_incident(incident_id: impl Into<String>) -> Self {
        Self::new().with_incident_id(incident_id)
    }

    pub fn with_incident_id(mut self, incident_id: impl Into<String>) -> Self {
        self.incident_id = Some(incident_id.into());
        self
    }

    pub fn with_category(mut self, category: AuditCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn after(mut self, id: i64) -> Self {
        self.after_id = Some(id);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }
}

/// Trait for audit event storage
pub trait AuditStore: Send + Sync {
    /// Insert an audit record, returns the assigned ID
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError>;

    /// Up to `filter.limit` matching records, oldest first
    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError>;

    /// Count matching records, ignoring `filter.limit`
    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError>;
}
