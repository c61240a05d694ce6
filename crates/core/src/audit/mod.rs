//! Audit trail of instance lifecycle, saga steps and signals.
//!
//! Components emit through a cloneable `AuditHandle`; a single `AuditWriter`
//! task persists events to an `AuditStore`.

mod events;
mod handle;
mod sqlite;
mod store;
mod writer;

pub use events::*;
pub use handle::*;
pub use sqlite::*;
pub use store::*;
pub use writer::*;
