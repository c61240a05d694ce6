//! SQLite-backed instance store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::{InstanceFilter, InstanceStore, StoreError};
use crate::saga::InstanceState;

/// SQLite-backed instance store.
///
/// Each row holds the full JSON record plus the columns needed for filtering.
pub struct SqliteInstanceStore {
    conn: Mutex<Connection>,
}

impl SqliteInstanceStore {
    /// Create a new SQLite instance store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite instance store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS instances (
                incident_id TEXT PRIMARY KEY,
                wait_state TEXT NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                state TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_instances_wait_state ON instances(wait_state);
            CREATE INDEX IF NOT EXISTS idx_instances_created_at ON instances(created_at);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    fn build_where_clause(filter: &InstanceFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref wait_state) = filter.wait_state {
            conditions.push("wait_state = ?");
            params.push(Box::new(wait_state.clone()));
        }

        if filter.active_only {
            conditions.push("wait_state NOT IN ('completed', 'failed')");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn decode(json: &str) -> Result<InstanceState, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl InstanceStore for SqliteInstanceStore {
    fn save(&self, state: &InstanceState) -> Result<(), StoreError> {
        let state_json =
            serde_json::to_string(state).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let conn = self.conn()?;
        conn.execute(
            r#"INSERT INTO instances (incident_id, wait_state, attempts, state, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(incident_id) DO UPDATE SET
                   wait_state = excluded.wait_state,
                   attempts = excluded.attempts,
                   state = excluded.state,
                   updated_at = excluded.updated_at"#,
            params![
                state.id(),
                state.wait.state_type(),
                state.attempts,
                state_json,
                state.created_at.to_rfc3339(),
                state.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get(&self, incident_id: &str) -> Result<Option<InstanceState>, StoreError> {
        let conn = self.conn()?;

        let json: Option<String> = conn
            .query_row(
                "SELECT state FROM instances WHERE incident_id = ?",
                params![incident_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        json.as_deref().map(Self::decode).transpose()
    }

    fn list(&self, filter: &InstanceFilter) -> Result<Vec<InstanceState>, StoreError> {
        let conn = self.conn()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!(
            "SELECT state FROM instances {} ORDER BY created_at ASC, incident_id ASC LIMIT ? OFFSET ?",
            where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut all_params = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut states = Vec::new();
        for row in rows {
            let json = row.map_err(|e| StoreError::Database(e.to_string()))?;
            states.push(Self::decode(&json)?);
        }

        Ok(states)
    }

    fn count(&self, filter: &InstanceFilter) -> Result<i64, StoreError> {
        let conn = self.conn()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM instances {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn delete(&self, incident_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM instances WHERE incident_id = ?",
                params![incident_id],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(deleted > 0)
    }
}
