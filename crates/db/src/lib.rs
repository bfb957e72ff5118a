//! PostgreSQL backend for the work dispatcher.
//!
//! `repositories` holds the raw queries (zero-sized repos taking `&PgPool`);
//! `store` adapts them to the `dispatch_core` storage traits.

pub mod models;
pub mod repositories;
pub mod store;

use std::sync::Arc;

use dispatch_core::context::DispatchContext;
use dispatch_core::registry::WorkerRegistry;
use sqlx::postgres::PgPoolOptions;

pub use store::{PgJobStore, PgWorkerStore};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the connection.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}

/// Build a dispatch context backed by PostgreSQL.
pub fn context(pool: DbPool, register_max_attempts: u32) -> DispatchContext {
    let registry = WorkerRegistry::new(Arc::new(PgWorkerStore::new(pool.clone())))
        .with_max_attempts(register_max_attempts);
    DispatchContext::with_registry(Arc::new(PgJobStore::new(pool)), registry)
}
