//! In-process store backends.
//!
//! All job state sits behind one `RwLock`; every transition, including the
//! claim, happens under the write guard, which makes `claim_next` atomic
//! with respect to other callers sharing the same store.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::error::CoreError;
use crate::job::{Job, JobCounts, JobListQuery, JobState};
use crate::store::{JobStore, WorkerStore};
use crate::types::JobId;
use crate::worker::Worker;

const BACKEND: &str = "memory";

#[derive(Debug, Default)]
struct MemoryJobs {
    jobs: HashMap<JobId, Job>,
    /// Every job id in submission order.
    order: Vec<JobId>,
    /// Pending job ids, oldest first.
    pending: VecDeque<JobId>,
}

impl MemoryJobs {
    fn insert(&mut self, job: Job) {
        self.order.push(job.id);
        self.pending.push_back(job.id);
        self.jobs.insert(job.id, job);
    }

    fn get_mut(&mut self, job_id: JobId) -> Result<&mut Job, CoreError> {
        self.jobs
            .get_mut(&job_id)
            .ok_or_else(|| CoreError::job_not_found(job_id))
    }
}

/// Job store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    inner: RwLock<MemoryJobs>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip_all, err)]
    async fn submit(&self, payload: serde_json::Value) -> Result<JobId, CoreError> {
        let mut inner = self.inner.write().await;
        // Stamped under the guard so FIFO order matches `created_at`.
        let job = Job::new(payload);
        let id = job.id;
        inner.insert(job);
        tracing::debug!(job_id = %id, "Job stored");
        Ok(id)
    }

    async fn next_pending(&self) -> Result<Option<Job>, CoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .pending
            .iter()
            .filter_map(|id| inner.jobs.get(id))
            .find(|job| job.state == JobState::Pending)
            .cloned())
    }

    #[instrument(skip_all, err, fields(job_id = %job_id, worker_id = %worker_id))]
    async fn mark_running(&self, job_id: JobId, worker_id: &str) -> Result<Job, CoreError> {
        let mut inner = self.inner.write().await;
        let job = inner.get_mut(job_id)?;
        job.start(worker_id)?;
        let job = job.clone();
        inner.pending.retain(|id| *id != job_id);
        Ok(job)
    }

    #[instrument(skip_all, err, fields(worker_id = %worker_id))]
    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>, CoreError> {
        let mut inner = self.inner.write().await;
        while let Some(job_id) = inner.pending.pop_front() {
            let job = inner.get_mut(job_id)?;
            // Entries can go stale if a job was started through mark_running.
            if job.state != JobState::Pending {
                continue;
            }
            job.start(worker_id)?;
            return Ok(Some(job.clone()));
        }
        Ok(None)
    }

    #[instrument(skip_all, err, fields(job_id = %job_id))]
    async fn mark_done(&self, job_id: JobId) -> Result<Job, CoreError> {
        let mut inner = self.inner.write().await;
        let job = inner.get_mut(job_id)?;
        job.finish()?;
        Ok(job.clone())
    }

    #[instrument(skip_all, err, fields(job_id = %job_id))]
    async fn mark_failed(&self, job_id: JobId, reason: &str) -> Result<Job, CoreError> {
        let mut inner = self.inner.write().await;
        let job = inner.get_mut(job_id)?;
        job.fail(reason)?;
        Ok(job.clone())
    }

    #[instrument(skip_all, err, fields(job_id = %job_id))]
    async fn resubmit(&self, job_id: JobId) -> Result<Job, CoreError> {
        let mut inner = self.inner.write().await;
        let original = inner.get_mut(job_id)?;
        if original.state != JobState::Failed {
            return Err(CoreError::InvalidTransition {
                job_id,
                from: original.state,
                to: JobState::Pending,
            });
        }
        let retry = Job::retry_of(original);
        inner.insert(retry.clone());
        Ok(retry)
    }

    async fn find(&self, job_id: JobId) -> Result<Option<Job>, CoreError> {
        Ok(self.inner.read().await.jobs.get(&job_id).cloned())
    }

    async fn list(&self, query: &JobListQuery) -> Result<Vec<Job>, CoreError> {
        let inner = self.inner.read().await;
        // limit() and offset() are clamped to be non-negative.
        let jobs = inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.jobs.get(id))
            .filter(|job| query.state.map_or(true, |s| job.state == s))
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .cloned()
            .collect();
        Ok(jobs)
    }

    async fn counts(&self) -> Result<JobCounts, CoreError> {
        let inner = self.inner.read().await;
        let mut counts = JobCounts::default();
        for job in inner.jobs.values() {
            counts.add(job.state, 1);
        }
        Ok(counts)
    }
}

/// Worker store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryWorkerStore {
    workers: RwLock<Vec<Worker>>,
}

impl MemoryWorkerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkerStore for MemoryWorkerStore {
    async fn insert(&self, worker: &Worker) -> Result<bool, CoreError> {
        let mut workers = self.workers.write().await;
        if workers.iter().any(|w| w.id == worker.id) {
            return Ok(false);
        }
        workers.push(worker.clone());
        Ok(true)
    }

    async fn find(&self, id: &str) -> Result<Option<Worker>, CoreError> {
        let workers = self.workers.read().await;
        Ok(workers.iter().find(|w| w.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Worker>, CoreError> {
        Ok(self.workers.read().await.clone())
    }
}
