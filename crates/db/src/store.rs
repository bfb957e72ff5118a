//! `dispatch_core` storage traits implemented on top of the repositories.

use async_trait::async_trait;
use dispatch_core::error::CoreError;
use dispatch_core::job::{Job, JobCounts, JobListQuery, JobState};
use dispatch_core::store::{JobStore, WorkerStore};
use dispatch_core::types::JobId;
use dispatch_core::worker::Worker;
use sqlx::PgPool;
use tracing::instrument;

use crate::models::job::JobRow;
use crate::repositories::{JobRepo, WorkerRepo};

const BACKEND: &str = "postgres";

/// Every sqlx failure surfaces as a storage error.
fn storage_err(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Database error");
    CoreError::Storage(err.to_string())
}

fn to_job(row: Option<JobRow>) -> Result<Option<Job>, CoreError> {
    row.map(Job::try_from).transpose()
}

/// Job store backed by the `jobs` table.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explain why a guarded update matched no row.
    async fn rejected(&self, job_id: JobId, to: JobState) -> CoreError {
        match JobRepo::find_by_id(&self.pool, job_id).await {
            Ok(Some(row)) => match JobState::try_from(row.state_id) {
                Ok(from) => CoreError::InvalidTransition { job_id, from, to },
                Err(e) => e,
            },
            Ok(None) => CoreError::job_not_found(job_id),
            Err(e) => storage_err(e),
        }
    }

    async fn guarded(
        &self,
        job_id: JobId,
        to: JobState,
        row: Result<Option<JobRow>, sqlx::Error>,
    ) -> Result<Job, CoreError> {
        match row.map_err(storage_err)? {
            Some(row) => Job::try_from(row),
            None => Err(self.rejected(job_id, to).await),
        }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip_all, err)]
    async fn submit(&self, payload: serde_json::Value) -> Result<JobId, CoreError> {
        let row = JobRepo::insert(&self.pool, &Job::new(payload))
            .await
            .map_err(storage_err)?;
        Ok(row.id)
    }

    async fn next_pending(&self) -> Result<Option<Job>, CoreError> {
        to_job(JobRepo::oldest_pending(&self.pool).await.map_err(storage_err)?)
    }

    #[instrument(skip_all, err, fields(job_id = %job_id, worker_id = %worker_id))]
    async fn mark_running(&self, job_id: JobId, worker_id: &str) -> Result<Job, CoreError> {
        let row = JobRepo::mark_running(&self.pool, job_id, worker_id).await;
        self.guarded(job_id, JobState::Running, row).await
    }

    #[instrument(skip_all, err, fields(worker_id = %worker_id))]
    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>, CoreError> {
        to_job(
            JobRepo::claim_next(&self.pool, worker_id)
                .await
                .map_err(storage_err)?,
        )
    }

    #[instrument(skip_all, err, fields(job_id = %job_id))]
    async fn mark_done(&self, job_id: JobId) -> Result<Job, CoreError> {
        let row = JobRepo::mark_done(&self.pool, job_id).await;
        self.guarded(job_id, JobState::Done, row).await
    }

    #[instrument(skip_all, err, fields(job_id = %job_id))]
    async fn mark_failed(&self, job_id: JobId, reason: &str) -> Result<Job, CoreError> {
        let row = JobRepo::mark_failed(&self.pool, job_id, reason).await;
        self.guarded(job_id, JobState::Failed, row).await
    }

    #[instrument(skip_all, err, fields(job_id = %job_id))]
    async fn resubmit(&self, job_id: JobId) -> Result<Job, CoreError> {
        match JobRepo::retry(&self.pool, job_id, JobId::now_v7())
            .await
            .map_err(storage_err)?
        {
            Some(row) => Job::try_from(row),
            // The retry is a new pending job, so a non-failed source reads
            // as an illegal move back to pending.
            None => Err(self.rejected(job_id, JobState::Pending).await),
        }
    }

    async fn find(&self, job_id: JobId) -> Result<Option<Job>, CoreError> {
        to_job(
            JobRepo::find_by_id(&self.pool, job_id)
                .await
                .map_err(storage_err)?,
        )
    }

    async fn list(&self, query: &JobListQuery) -> Result<Vec<Job>, CoreError> {
        JobRepo::list(&self.pool, query)
            .await
            .map_err(storage_err)?
            .into_iter()
            .map(Job::try_from)
            .collect()
    }

    async fn counts(&self) -> Result<JobCounts, CoreError> {
        let mut counts = JobCounts::default();
        for row in JobRepo::count_by_state(&self.pool)
            .await
            .map_err(storage_err)?
        {
            counts.add(JobState::try_from(row.state_id)?, row.count);
        }
        Ok(counts)
    }
}

/// Worker store backed by the `workers` table.
#[derive(Debug, Clone)]
pub struct PgWorkerStore {
    pool: PgPool,
}

impl PgWorkerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkerStore for PgWorkerStore {
    async fn insert(&self, worker: &Worker) -> Result<bool, CoreError> {
        let inserted = WorkerRepo::insert(&self.pool, worker)
            .await
            .map_err(storage_err)?;
        Ok(inserted.is_some())
    }

    async fn find(&self, id: &str) -> Result<Option<Worker>, CoreError> {
        Ok(WorkerRepo::find_by_id(&self.pool, id)
            .await
            .map_err(storage_err)?
            .map(Worker::from))
    }

    async fn list(&self) -> Result<Vec<Worker>, CoreError> {
        Ok(WorkerRepo::list(&self.pool)
            .await
            .map_err(storage_err)?
            .into_iter()
            .map(Worker::from)
            .collect())
    }
}
