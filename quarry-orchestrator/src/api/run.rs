//! Run API Handlers
//!
//! HTTP endpoints for submitting segment runs and reading their outcome.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use quarry_core::domain::run::Run;
use quarry_core::dto::run::{RunSummary, SubmitRun, SubmittedRun};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::run_service;

/// POST /api/runs
/// Submit a new segment run
pub async fn submit_run(
    State(state): State<AppState>,
    Json(req): Json<SubmitRun>,
) -> ApiResult<(StatusCode, Json<SubmittedRun>)> {
    tracing::info!("Submitting run for segment: {}", req.category);

    let submitted = run_service::submit_run(
        state.store.as_ref(),
        state.remote.as_ref(),
        state.queue.as_ref(),
        req,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(submitted)))
}

/// GET /api/runs/{id}
/// Get a run, including its rows once it succeeded
pub async fn get_run(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Run>> {
    tracing::debug!("Getting run: {}", id);

    let run = run_service::get_run(state.store.as_ref(), id).await?;
    Ok(Json(run))
}

/// GET /api/runs/latest/{category}
/// Get the most recent run of a segment
pub async fn latest_run(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Json<Run>> {
    tracing::debug!("Getting latest run for segment: {}", category);

    let run = run_service::latest_run(state.store.as_ref(), &category).await?;
    Ok(Json(run))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

/// GET /api/runs?limit=N
/// List recent runs, newest first
pub async fn list_runs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<RunSummary>>> {
    tracing::debug!("Listing runs (limit: {:?})", params.limit);

    let runs = run_service::recent_runs(state.store.as_ref(), params.limit).await?;
    Ok(Json(runs.iter().map(RunSummary::from).collect()))
}
