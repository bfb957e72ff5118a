//! Dispatcher façade over a shared [`JobStore`].
//!
//! Hands the oldest pending job to a requesting worker through the store's
//! atomic [`JobStore::claim_next`], and records completion or failure.
//! Errors from the store are returned unchanged; nothing is retried here.

use std::sync::Arc;

use crate::error::CoreError;
use crate::job::Job;
use crate::store::JobStore;
use crate::types::JobId;

pub struct Dispatcher {
    jobs: Arc<dyn JobStore>,
}

impl Dispatcher {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }

    pub async fn submit(&self, payload: serde_json::Value) -> Result<JobId, CoreError> {
        let job_id = self.jobs.submit(payload).await?;
        tracing::info!(job_id = %job_id, "Job submitted");
        Ok(job_id)
    }

    /// Claim the next pending job for `worker_id`, or `None` when idle.
    pub async fn next_job(&self, worker_id: &str) -> Result<Option<Job>, CoreError> {
        let claimed = self.jobs.claim_next(worker_id).await?;
        if let Some(ref job) = claimed {
            tracing::info!(job_id = %job.id, worker_id, "Job claimed by worker");
        }
        Ok(claimed)
    }

    pub async fn complete(&self, job_id: JobId) -> Result<Job, CoreError> {
        let job = self.jobs.mark_done(job_id).await?;
        tracing::info!(job_id = %job_id, worker_id = ?job.assigned_worker, "Job completed");
        Ok(job)
    }

    pub async fn fail(&self, job_id: JobId, reason: &str) -> Result<Job, CoreError> {
        let job = self.jobs.mark_failed(job_id, reason).await?;
        tracing::warn!(
            job_id = %job_id,
            worker_id = ?job.assigned_worker,
            reason,
            "Job failed",
        );
        Ok(job)
    }

    /// Manually retry a failed job as a new pending job.
    ///
    /// This is the only retry path; failed jobs are never re-queued
    /// automatically.
    pub async fn retry(&self, job_id: JobId) -> Result<Job, CoreError> {
        let job = self.jobs.resubmit(job_id).await?;
        tracing::info!(original_job_id = %job_id, new_job_id = %job.id, "Job retried");
        Ok(job)
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.jobs
    }
}
