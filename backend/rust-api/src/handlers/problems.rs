use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    handlers::error::ApiError,
    models::Problem,
    services::{gatekeeper::Gatekeeper, AppState},
};

#[derive(Debug, Deserialize)]
pub struct ProblemQuery {
    pub username: Option<String>,
}

/// GET /api/problems/section/{section_id}
pub async fn list_section_problems(
    State(state): State<Arc<AppState>>,
    Path(section_id): Path<String>,
) -> Result<Json<Vec<Problem>>, ApiError> {
    if state.catalog.section(&section_id).is_none() {
        return Err(ApiError::NotFound("Section not found".to_string()));
    }

    let problems = state
        .catalog
        .problems_in_section(&section_id)
        .cloned()
        .collect();
    Ok(Json(problems))
}

/// GET /api/problems/{problem_id}?username=...
pub async fn get_problem(
    State(state): State<Arc<AppState>>,
    Path(problem_id): Path<String>,
    Query(query): Query<ProblemQuery>,
) -> Result<Json<Problem>, ApiError> {
    Gatekeeper::new(
        state.store.as_ref(),
        &state.catalog,
        state.config.gate_failure_policy,
    )
    .ensure_allowed(query.username.as_deref(), &problem_id)
    .await?;

    let problem = state
        .catalog
        .problem(&problem_id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;
    Ok(Json(problem))
}
