//! Integration tests for `PgWorkerStore` and registration on top of it.

use std::sync::Arc;

use assert_matches::assert_matches;
use dispatch_core::error::CoreError;
use dispatch_core::registry::WorkerRegistry;
use dispatch_core::store::WorkerStore;
use dispatch_core::worker::Worker;
use dispatch_db::PgWorkerStore;
use sqlx::PgPool;

fn fixed_id() -> String {
    "worker-collides".to_string()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insert_reports_collisions(pool: PgPool) {
    let store = PgWorkerStore::new(pool);
    let worker = Worker::new("worker-a".into(), Some("encoder".into()));

    assert!(store.insert(&worker).await.unwrap());
    assert!(!store.insert(&worker).await.unwrap());

    let found = store.find("worker-a").await.unwrap().unwrap();
    assert_eq!(found.name.as_deref(), Some("encoder"));
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_registry_registers_unique_workers(pool: PgPool) {
    let registry = WorkerRegistry::new(Arc::new(PgWorkerStore::new(pool)));
    let a = registry.register().await.unwrap();
    let b = registry.register_named(Some("gpu-2".into())).await.unwrap();

    assert_ne!(a.id, b.id);
    let ids: Vec<String> = registry
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.id)
        .collect();
    assert!(ids.contains(&a.id) && ids.contains(&b.id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_registry_gives_up_after_collisions(pool: PgPool) {
    let registry = WorkerRegistry::new(Arc::new(PgWorkerStore::new(pool)))
        .with_id_generator(fixed_id);

    registry.register().await.unwrap();
    assert_matches!(
        registry.register().await,
        Err(CoreError::Registration { attempts: 5 })
    );
}
