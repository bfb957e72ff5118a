pub mod health;
pub mod jobs;
pub mod workers;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /workers                       register, list
/// /workers/{id}                  get
/// /workers/{id}/next-job         claim work (POST)
///
/// /jobs                          submit, list
/// /jobs/stats                    counts per state
/// /jobs/{id}                     get
/// /jobs/{id}/complete            report completion (POST)
/// /jobs/{id}/fail                report failure (POST)
/// /jobs/{id}/retry               manual retry of a failed job (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/workers", workers::router())
        .nest("/jobs", jobs::router())
}
