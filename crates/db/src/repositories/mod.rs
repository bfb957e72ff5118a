//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod job_repo;
pub mod worker_repo;

pub use job_repo::JobRepo;
pub use worker_repo::WorkerRepo;
