//! Worker registration with bounded id-collision retries.

use std::sync::Arc;

use tracing::instrument;

use crate::error::CoreError;
use crate::store::{require_worker, WorkerStore};
use crate::types::WorkerId;
use crate::worker::{random_worker_id, validate_worker_name, Worker};

/// Attempts made before registration gives up on id collisions.
pub const DEFAULT_REGISTER_ATTEMPTS: u32 = 5;

/// Issues unique worker ids and persists worker records.
pub struct WorkerRegistry {
    store: Arc<dyn WorkerStore>,
    max_attempts: u32,
    generate_id: fn() -> WorkerId,
}

impl WorkerRegistry {
    pub fn new(store: Arc<dyn WorkerStore>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_REGISTER_ATTEMPTS,
            generate_id: random_worker_id,
        }
    }

    /// Override the retry budget. Values below 1 are treated as 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Override the id generator (used by tests to force collisions).
    pub fn with_id_generator(mut self, generate_id: fn() -> WorkerId) -> Self {
        self.generate_id = generate_id;
        self
    }

    /// Register an anonymous worker.
    pub async fn register(&self) -> Result<Worker, CoreError> {
        self.register_named(None).await
    }

    /// Register a worker with an optional human-readable label.
    #[instrument(skip(self))]
    pub async fn register_named(&self, name: Option<String>) -> Result<Worker, CoreError> {
        if let Some(ref name) = name {
            validate_worker_name(name)?;
        }

        for attempt in 1..=self.max_attempts {
            let worker = Worker::new((self.generate_id)(), name.clone());
            if self.store.insert(&worker).await? {
                tracing::info!(worker_id = %worker.id, attempt, "Worker registered");
                return Ok(worker);
            }
            tracing::warn!(worker_id = %worker.id, attempt, "Worker id collision, retrying");
        }

        Err(CoreError::Registration {
            attempts: self.max_attempts,
        })
    }

    pub async fn find(&self, id: &str) -> Result<Option<Worker>, CoreError> {
        self.store.find(id).await
    }

    /// Look up a worker, failing with `NotFound` when it was never registered.
    pub async fn require(&self, id: &WorkerId) -> Result<Worker, CoreError> {
        require_worker(self.store.as_ref(), id).await
    }

    pub async fn list(&self) -> Result<Vec<Worker>, CoreError> {
        self.store.list().await
    }
}
