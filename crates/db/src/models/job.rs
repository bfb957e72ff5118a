//! Row model for the `jobs` table.

use dispatch_core::error::CoreError;
use dispatch_core::job::{Job, JobState, StateId};
use dispatch_core::types::{JobId, Timestamp, WorkerId};
use sqlx::FromRow;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: JobId,
    pub payload: serde_json::Value,
    pub state_id: StateId,
    pub assigned_worker: Option<WorkerId>,
    pub failure_reason: Option<String>,
    pub retry_of_job_id: Option<JobId>,
    pub created_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl TryFrom<JobRow> for Job {
    type Error = CoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            payload: row.payload,
            state: JobState::try_from(row.state_id)?,
            assigned_worker: row.assigned_worker,
            failure_reason: row.failure_reason,
            retry_of_job_id: row.retry_of_job_id,
            created_at: row.created_at,
            claimed_at: row.claimed_at,
            completed_at: row.completed_at,
        })
    }
}

/// One `(state_id, count)` pair from the per-state aggregate.
#[derive(Debug, Clone, FromRow)]
pub struct StateCount {
    pub state_id: StateId,
    pub count: i64,
}
