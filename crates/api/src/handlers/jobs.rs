//! Handlers for the `/jobs` resource.
//!
//! Submission and inspection are open to any client; completion and failure
//! reports are sent by the worker that claimed the job.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use dispatch_core::job::JobListQuery;
use dispatch_core::store::require_job;
use dispatch_core::types::JobId;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /api/v1/jobs`.
#[derive(Debug, Deserialize)]
pub struct SubmitJob {
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Body of `POST /api/v1/jobs/{id}/fail`.
#[derive(Debug, Deserialize, Validate)]
pub struct FailJob {
    #[validate(length(min = 1, max = 4096))]
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Submit a new job. Returns 201 with the created job in `pending` state.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(input): Json<SubmitJob>,
) -> AppResult<impl IntoResponse> {
    let job_id = state.ctx.dispatcher.submit(input.payload).await?;
    let job = require_job(state.ctx.jobs.as_ref(), job_id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs
///
/// List jobs newest first. Supports optional `state`, `limit`, and `offset`
/// query parameters.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = state.ctx.jobs.list(&params).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/stats
pub async fn job_stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let counts = state.ctx.jobs.counts().await?;
    Ok(Json(DataResponse { data: counts }))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = require_job(state.ctx.jobs.as_ref(), job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Lifecycle reports
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/complete
///
/// Returns the finished job, or 409 if the job is not running.
pub async fn complete_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = state.ctx.dispatcher.complete(job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/jobs/{id}/fail
///
/// Returns the failed job, or 409 if the job is not running.
pub async fn fail_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
    Json(input): Json<FailJob>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let job = state.ctx.dispatcher.fail(job_id, &input.reason).await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/jobs/{id}/retry
///
/// Create a new pending job from a failed job's payload. Only failed jobs
/// can be retried; anything else yields 409. This is the ONLY way to retry
/// a job; no automatic retry exists.
pub async fn retry_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let new_job = state.ctx.dispatcher.retry(job_id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: new_job })))
}
