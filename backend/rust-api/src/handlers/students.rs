use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::AppJson,
    handlers::error::ApiError,
    models::progress::{AttemptResponse, ProblemAttempt, ProgressRecord, ProgressRollup, ProgressUpdate},
    services::{attempt_service::AttemptService, progress_service::ProgressService, AppState},
};

/// GET /api/students/{username}/progress
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<ProgressRollup>, ApiError> {
    let rollup = ProgressService::new(state.store.as_ref(), &state.catalog)
        .rollup(&username)
        .await?;
    Ok(Json(rollup))
}

/// POST /api/students/{username}/attempt
pub async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    AppJson(req): AppJson<ProblemAttempt>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let response = AttemptService::new(
        state.store.as_ref(),
        &state.catalog,
        state.config.gate_failure_policy,
    )
    .submit(&username, &req)
    .await?;
    Ok(Json(response))
}

/// POST /api/updateProgress
pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ProgressUpdate>,
) -> Result<Json<ProgressRecord>, ApiError> {
    let record = ProgressService::new(state.store.as_ref(), &state.catalog)
        .mark_stage(&req)
        .await?;
    Ok(Json(record))
}
