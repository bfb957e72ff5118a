//! Handlers for worker registration and work requests.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dispatch_core::types::WorkerId;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /api/v1/workers`. Send `{}` for an anonymous worker.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterWorker {
    #[serde(default)]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// POST /workers
// ---------------------------------------------------------------------------

/// Register a worker and return its newly issued id.
pub async fn register_worker(
    State(state): State<AppState>,
    Json(input): Json<RegisterWorker>,
) -> AppResult<impl IntoResponse> {
    let worker = state.ctx.registry.register_named(input.name).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: worker })))
}

// ---------------------------------------------------------------------------
// GET /workers, GET /workers/{id}
// ---------------------------------------------------------------------------

pub async fn list_workers(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let workers = state.ctx.registry.list().await?;
    Ok(Json(DataResponse { data: workers }))
}

pub async fn get_worker(
    State(state): State<AppState>,
    Path(worker_id): Path<WorkerId>,
) -> AppResult<impl IntoResponse> {
    let worker = state.ctx.registry.require(&worker_id).await?;
    Ok(Json(DataResponse { data: worker }))
}

// ---------------------------------------------------------------------------
// POST /workers/{id}/next-job
// ---------------------------------------------------------------------------

/// Claim the next pending job for a registered worker.
///
/// Returns 200 with the claimed job, 204 when no work is available, or 404
/// if the worker was never registered.
pub async fn next_job(
    State(state): State<AppState>,
    Path(worker_id): Path<WorkerId>,
) -> AppResult<Response> {
    state.ctx.registry.require(&worker_id).await?;

    let response = match state.ctx.dispatcher.next_job(&worker_id).await? {
        Some(job) => Json(DataResponse { data: job }).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };
    Ok(response)
}
