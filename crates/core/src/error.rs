use crate::job::JobState;
use crate::types::JobId;

/// Domain error shared by every store backend and the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The underlying persistence layer is unavailable or rejected the call.
    /// Surfaced to the caller as-is; never retried automatically.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The caller asked for a state change the job lifecycle does not allow.
    #[error("Invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: JobId,
        from: JobState,
        to: JobState,
    },

    /// Every generated worker id collided with an existing one.
    #[error("Worker registration failed after {attempts} attempts")]
    Registration { attempts: u32 },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl CoreError {
    pub fn job_not_found(id: JobId) -> Self {
        CoreError::NotFound {
            entity: "Job",
            id: id.to_string(),
        }
    }

    pub fn worker_not_found(id: &str) -> Self {
        CoreError::NotFound {
            entity: "Worker",
            id: id.to_string(),
        }
    }
}
