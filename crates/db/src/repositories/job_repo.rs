//! Repository for the `jobs` table.
//!
//! Every state change is a guarded `UPDATE ... WHERE state_id = <expected>`,
//! so a transition that lost a race simply matches no row and returns
//! `None`. Callers decide whether that means "not found" or "wrong state".

use dispatch_core::job::{Job, JobListQuery, JobState};
use dispatch_core::types::JobId;
use sqlx::PgPool;

use crate::models::job::{JobRow, StateCount};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, payload, state_id, assigned_worker, failure_reason, retry_of_job_id, \
    created_at, claimed_at, completed_at";

/// Provides queries for dispatch jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a freshly built pending job.
    pub async fn insert(pool: &PgPool, job: &Job) -> Result<JobRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (id, payload, state_id, retry_of_job_id, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(job.id)
            .bind(&job.payload)
            .bind(JobState::Pending.id())
            .bind(job.retry_of_job_id)
            .bind(job.created_at)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: JobId) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Oldest pending job, read without locking.
    pub async fn oldest_pending(pool: &PgPool) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE state_id = $1 \
             ORDER BY created_at ASC, id ASC \
             LIMIT 1"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(JobState::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Move one specific pending job to running.
    pub async fn mark_running(
        pool: &PgPool,
        id: JobId,
        worker_id: &str,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET state_id = $3, assigned_worker = $2, claimed_at = NOW() \
             WHERE id = $1 AND state_id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .bind(worker_id)
            .bind(JobState::Running.id())
            .bind(JobState::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim the oldest pending job for a worker.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent claimers each get
    /// a different row (or none) instead of blocking on the same one.
    pub async fn claim_next(
        pool: &PgPool,
        worker_id: &str,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET state_id = $2, assigned_worker = $1, claimed_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE state_id = $3 \
                 ORDER BY created_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(worker_id)
            .bind(JobState::Running.id())
            .bind(JobState::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Move a running job to done.
    pub async fn mark_done(pool: &PgPool, id: JobId) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET state_id = $2, completed_at = NOW() \
             WHERE id = $1 AND state_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .bind(JobState::Done.id())
            .bind(JobState::Running.id())
            .fetch_optional(pool)
            .await
    }

    /// Move a running job to failed with a reason.
    ///
    /// No automatic retry is performed. The job stays failed until someone
    /// explicitly calls [`JobRepo::retry`].
    pub async fn mark_failed(
        pool: &PgPool,
        id: JobId,
        reason: &str,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET state_id = $2, failure_reason = $3, completed_at = NOW() \
             WHERE id = $1 AND state_id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .bind(JobState::Failed.id())
            .bind(reason)
            .bind(JobState::Running.id())
            .fetch_optional(pool)
            .await
    }

    /// Create a new pending job from a failed job's payload.
    ///
    /// Returns `None` when `id` does not name a failed job. The new row has
    /// `retry_of_job_id` pointing to the original.
    pub async fn retry(
        pool: &PgPool,
        id: JobId,
        new_id: JobId,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (id, payload, state_id, retry_of_job_id) \
             SELECT $2, payload, $3, id FROM jobs WHERE id = $1 AND state_id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .bind(new_id)
            .bind(JobState::Pending.id())
            .bind(JobState::Failed.id())
            .fetch_optional(pool)
            .await
    }

    /// List jobs newest first with optional state filter and pagination.
    pub async fn list(pool: &PgPool, params: &JobListQuery) -> Result<Vec<JobRow>, sqlx::Error> {
        let mut bind_idx: u32 = 1;

        let where_clause = if params.state.is_some() {
            bind_idx += 1;
            "WHERE state_id = $1"
        } else {
            ""
        };

        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, JobRow>(&query);
        if let Some(state) = params.state {
            q = q.bind(state.id());
        }
        q.bind(params.limit())
            .bind(params.offset())
            .fetch_all(pool)
            .await
    }

    /// Number of jobs per state. States with no jobs are absent.
    pub async fn count_by_state(pool: &PgPool) -> Result<Vec<StateCount>, sqlx::Error> {
        sqlx::query_as::<_, StateCount>(
            "SELECT state_id, COUNT(*) AS count FROM jobs GROUP BY state_id",
        )
        .fetch_all(pool)
        .await
    }
}
