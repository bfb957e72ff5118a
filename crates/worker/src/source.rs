//! Where a worker gets its jobs from.

use async_trait::async_trait;
use dispatch_core::context::DispatchContext;
use dispatch_core::job::Job;
use dispatch_core::types::{JobId, WorkerId};

use crate::error::WorkerError;

/// The four calls a worker makes against the dispatcher.
#[async_trait]
pub trait WorkSource: Send + Sync {
    async fn register(&self, name: Option<String>) -> Result<WorkerId, WorkerError>;

    /// `None` means no work is available right now.
    async fn next_job(&self, worker_id: &str) -> Result<Option<Job>, WorkerError>;

    async fn complete(&self, job_id: JobId) -> Result<(), WorkerError>;

    async fn fail(&self, job_id: JobId, reason: &str) -> Result<(), WorkerError>;
}

/// In-process source: workers sharing the dispatcher's address space.
#[async_trait]
impl WorkSource for DispatchContext {
    async fn register(&self, name: Option<String>) -> Result<WorkerId, WorkerError> {
        Ok(self.registry.register_named(name).await?.id)
    }

    async fn next_job(&self, worker_id: &str) -> Result<Option<Job>, WorkerError> {
        Ok(self.dispatcher.next_job(worker_id).await?)
    }

    async fn complete(&self, job_id: JobId) -> Result<(), WorkerError> {
        self.dispatcher.complete(job_id).await?;
        Ok(())
    }

    async fn fail(&self, job_id: JobId, reason: &str) -> Result<(), WorkerError> {
        self.dispatcher.fail(job_id, reason).await?;
        Ok(())
    }
}
