use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    handlers::error::ApiError,
    services::{admin_service::AdminService, AppState},
    store::{CollectionCounts, LearnerWipe},
};

#[derive(Debug, Deserialize)]
pub struct AdminKeyQuery {
    pub admin_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WipeResponse {
    pub message: String,
    #[serde(flatten)]
    pub wipe: LearnerWipe,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub message: String,
    pub counts: CollectionCounts,
}

/// DELETE /api/admin/clear-all-data
pub async fn clear_all_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<WipeResponse>, ApiError> {
    let wipe = AdminService::new(state.store.as_ref(), &state.config)
        .clear_all_data()
        .await?;
    Ok(Json(WipeResponse {
        message: "All student data cleared".to_string(),
        wipe,
    }))
}

/// POST /api/admin/clear-test-data?admin_key=...
pub async fn clear_test_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminKeyQuery>,
) -> Result<Json<WipeResponse>, ApiError> {
    let wipe = AdminService::new(state.store.as_ref(), &state.config)
        .clear_test_data(query.admin_key.as_deref())
        .await?;
    Ok(Json(WipeResponse {
        message: "Test accounts cleared".to_string(),
        wipe,
    }))
}

/// GET /api/admin/stats
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<CollectionCounts>, ApiError> {
    let counts = AdminService::new(state.store.as_ref(), &state.config)
        .stats()
        .await?;
    Ok(Json(counts))
}

/// POST /api/admin/reset-db
pub async fn reset_db(State(state): State<Arc<AppState>>) -> Result<Json<ResetResponse>, ApiError> {
    let counts = AdminService::new(state.store.as_ref(), &state.config)
        .reset_db()
        .await?;
    Ok(Json(ResetResponse {
        message: "Database reset and curriculum reseeded".to_string(),
        counts,
    }))
}
