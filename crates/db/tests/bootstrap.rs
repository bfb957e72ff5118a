use sqlx::PgPool;

/// Connect, migrate, verify the lookup table matches `JobState`.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    dispatch_db::health_check(&pool).await.unwrap();

    let rows: Vec<(i16, String)> = sqlx::query_as("SELECT id, name FROM job_states ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();

    let expected: Vec<(i16, String)> = dispatch_core::job::JobState::ALL
        .iter()
        .map(|s| (s.id(), s.as_str().to_string()))
        .collect();
    assert_eq!(rows, expected);
}

/// A pending row can never carry a worker.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pending_job_rejects_assigned_worker(pool: PgPool) {
    let result = sqlx::query(
        "INSERT INTO jobs (id, payload, state_id, assigned_worker) VALUES ($1, 'null', 1, 'w1')",
    )
    .bind(uuid::Uuid::now_v7())
    .execute(&pool)
    .await;

    assert!(result.is_err(), "check constraint should reject the row");
}
