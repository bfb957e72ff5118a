//! Repository for the `workers` table.

use dispatch_core::worker::Worker;
use sqlx::PgPool;

use crate::models::worker::WorkerRow;

/// Column list for `workers` queries.
const COLUMNS: &str = "id, name, registered_at";

/// Provides queries for registered workers.
pub struct WorkerRepo;

impl WorkerRepo {
    /// Insert a worker unless its id already exists.
    ///
    /// Returns `None` on an id collision; the existing row is left untouched.
    pub async fn insert(pool: &PgPool, worker: &Worker) -> Result<Option<WorkerRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO workers (id, name, registered_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkerRow>(&query)
            .bind(&worker.id)
            .bind(&worker.name)
            .bind(worker.registered_at)
            .fetch_optional(pool)
            .await
    }

    /// Find a worker by its ID.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<WorkerRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workers WHERE id = $1");
        sqlx::query_as::<_, WorkerRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all workers, oldest registration first.
    pub async fn list(pool: &PgPool) -> Result<Vec<WorkerRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workers ORDER BY registered_at ASC, id ASC");
        sqlx::query_as::<_, WorkerRow>(&query)
            .fetch_all(pool)
            .await
    }
}
