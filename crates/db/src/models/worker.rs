//! Row model for the `workers` table.

use dispatch_core::types::{Timestamp, WorkerId};
use dispatch_core::worker::Worker;
use sqlx::FromRow;

/// A row from the `workers` table.
#[derive(Debug, Clone, FromRow)]
pub struct WorkerRow {
    pub id: WorkerId,
    pub name: Option<String>,
    pub registered_at: Timestamp,
}

impl From<WorkerRow> for Worker {
    fn from(row: WorkerRow) -> Self {
        Worker {
            id: row.id,
            name: row.name,
            registered_at: row.registered_at,
        }
    }
}
