//! Storage ports implemented by the in-memory and PostgreSQL backends.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::job::{Job, JobCounts, JobListQuery};
use crate::types::{JobId, WorkerId};
use crate::worker::Worker;

/// Durable record of jobs and their lifecycle state.
///
/// Every mutating method enforces [`JobState::can_transition_to`] and fails
/// with [`CoreError::InvalidTransition`] otherwise. Unknown ids yield
/// [`CoreError::NotFound`].
///
/// [`JobState::can_transition_to`]: crate::job::JobState::can_transition_to
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Backend name reported by health checks.
    fn backend(&self) -> &'static str;

    /// Create a pending job.
    async fn submit(&self, payload: serde_json::Value) -> Result<JobId, CoreError>;

    /// Oldest pending job, without changing it.
    async fn next_pending(&self) -> Result<Option<Job>, CoreError>;

    /// pending -> running for `worker_id`.
    async fn mark_running(&self, job_id: JobId, worker_id: &str) -> Result<Job, CoreError>;

    /// Select the oldest pending job and mark it running for `worker_id` in
    /// one indivisible step. Two concurrent callers never receive the same job.
    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>, CoreError>;

    /// running -> done.
    async fn mark_done(&self, job_id: JobId) -> Result<Job, CoreError>;

    /// running -> failed, recording `reason`.
    async fn mark_failed(&self, job_id: JobId, reason: &str) -> Result<Job, CoreError>;

    /// Create a new pending job from a failed one. The failed job is untouched.
    async fn resubmit(&self, job_id: JobId) -> Result<Job, CoreError>;

    async fn find(&self, job_id: JobId) -> Result<Option<Job>, CoreError>;

    /// Newest first, filtered and paginated by `query`.
    async fn list(&self, query: &JobListQuery) -> Result<Vec<Job>, CoreError>;

    async fn counts(&self) -> Result<JobCounts, CoreError>;
}

/// Persistence for worker records. Ids are chosen by the caller.
#[async_trait]
pub trait WorkerStore: Send + Sync {
    /// Insert `worker` unless its id is already taken.
    ///
    /// Returns `Ok(false)` on an id collision so the caller can retry with a
    /// different id.
    async fn insert(&self, worker: &Worker) -> Result<bool, CoreError>;

    async fn find(&self, id: &str) -> Result<Option<Worker>, CoreError>;

    /// All workers, oldest registration first.
    async fn list(&self) -> Result<Vec<Worker>, CoreError>;
}

/// Look up a job or fail with `NotFound`.
pub async fn require_job(store: &dyn JobStore, job_id: JobId) -> Result<Job, CoreError> {
    store
        .find(job_id)
        .await?
        .ok_or_else(|| CoreError::job_not_found(job_id))
}

/// Look up a worker or fail with `NotFound`.
pub async fn require_worker(store: &dyn WorkerStore, id: &WorkerId) -> Result<Worker, CoreError> {
    store
        .find(id)
        .await?
        .ok_or_else(|| CoreError::worker_not_found(id))
}
