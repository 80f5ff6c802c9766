use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::{sync::Arc, time::Duration};

use crate::metrics;
use crate::services::AppState;

pub mod admin;
pub mod auth;
pub mod error;
pub mod problems;
pub mod students;
pub mod teacher;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(1);

/// GET /api
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Inequalities Tutor API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status_code, database) =
        match tokio::time::timeout(HEALTH_TIMEOUT, state.store.ping()).await {
            Ok(Ok(())) => (
                StatusCode::OK,
                json!({ "status": "healthy", "message": "Database connection successful" }),
            ),
            Ok(Err(e)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "status": "unhealthy", "error": format!("Database error: {}", e) }),
            ),
            Err(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "status": "unhealthy", "error": "Database timeout after 1s" }),
            ),
        };

    let status = if status_code == StatusCode::OK {
        "healthy"
    } else {
        "degraded"
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "service": "inequalities-tutor-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": { "database": database }
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// Protects /metrics with HTTP Basic auth against `metrics_auth`.
pub async fn metrics_auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let encoded = auth_header
        .strip_prefix("Basic ")
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    if credentials != state.config.metrics_auth {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
