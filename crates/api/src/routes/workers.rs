//! Route definitions for the `/workers` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::workers;
use crate::state::AppState;

/// Routes mounted at `/workers`.
///
/// ```text
/// GET    /                -> list_workers
/// POST   /                -> register_worker
/// GET    /{id}            -> get_worker
/// POST   /{id}/next-job   -> next_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(workers::list_workers).post(workers::register_worker))
        .route("/{id}", get(workers::get_worker))
        .route("/{id}/next-job", post(workers::next_job))
}
