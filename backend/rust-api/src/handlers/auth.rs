use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    extractors::AppJson,
    handlers::error::ApiError,
    models::student::{Student, StudentCreate, TeacherLogin, TeacherLoginResponse},
    services::{
        student_service::{teacher_login as check_teacher_code, StudentService},
        AppState,
    },
};

/// POST /api/auth/student-login
pub async fn student_login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<StudentCreate>,
) -> Result<Json<Student>, ApiError> {
    let student = StudentService::new(state.store.as_ref()).login(&req).await?;
    Ok(Json(student))
}

/// POST /api/auth/teacher-login
pub async fn teacher_login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<TeacherLogin>,
) -> Result<Json<TeacherLoginResponse>, ApiError> {
    let response = check_teacher_code(&req, &state.config.teacher_access_code)?;
    Ok(Json(response))
}

/// POST /api/auth/logout
///
/// Sessions live on the client; there is nothing to revoke here.
pub async fn logout() -> Json<Value> {
    Json(json!({ "message": "Logged out successfully" }))
}
