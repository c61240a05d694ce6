//! Persistence of resumable instance records.

mod sqlite_store;
mod store;

pub use sqlite_store::SqliteInstanceStore;
pub use store::{InstanceFilter, InstanceStore, StoreError};
