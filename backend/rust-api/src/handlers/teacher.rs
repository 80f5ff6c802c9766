use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::{
    handlers::error::ApiError,
    models::teacher::{ClassFilterQuery, Dashboard, StudentReport},
    services::{
        teacher_service::{parse_class_filter, TeacherService},
        AppState,
    },
};

/// GET /api/teacher/students?class_filter=...
pub async fn list_students(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClassFilterQuery>,
) -> Result<Json<Vec<StudentReport>>, ApiError> {
    let class_filter = parse_class_filter(query.class_filter.as_deref())?;
    let reports = TeacherService::new(state.store.as_ref(), &state.catalog)
        .student_reports(class_filter)
        .await?;
    Ok(Json(reports))
}

/// GET /api/teacher/dashboard?class_filter=...
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClassFilterQuery>,
) -> Result<Json<Dashboard>, ApiError> {
    let class_filter = parse_class_filter(query.class_filter.as_deref())?;
    let dashboard = TeacherService::new(state.store.as_ref(), &state.catalog)
        .dashboard(class_filter)
        .await?;
    Ok(Json(dashboard))
}
