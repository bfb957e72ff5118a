//! Explicit context bundling the stores, registry and dispatcher.
//!
//! Built once at startup and passed to whatever needs it; there is no
//! process-wide queue or pool.

use std::sync::Arc;

use crate::dispatcher::Dispatcher;
use crate::memory::{MemoryJobStore, MemoryWorkerStore};
use crate::registry::WorkerRegistry;
use crate::store::{JobStore, WorkerStore};

/// Cheaply cloneable handle to one dispatch deployment.
#[derive(Clone)]
pub struct DispatchContext {
    pub jobs: Arc<dyn JobStore>,
    pub registry: Arc<WorkerRegistry>,
    pub dispatcher: Arc<Dispatcher>,
}

impl DispatchContext {
    pub fn new(jobs: Arc<dyn JobStore>, workers: Arc<dyn WorkerStore>) -> Self {
        Self::with_registry(jobs, WorkerRegistry::new(workers))
    }

    /// Build around a pre-configured registry (e.g. a custom retry budget).
    pub fn with_registry(jobs: Arc<dyn JobStore>, registry: WorkerRegistry) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(Arc::clone(&jobs))),
            registry: Arc::new(registry),
            jobs,
        }
    }

    /// Context backed by the in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryJobStore::new()),
            Arc::new(MemoryWorkerStore::new()),
        )
    }

    pub fn backend(&self) -> &'static str {
        self.jobs.backend()
    }
}
