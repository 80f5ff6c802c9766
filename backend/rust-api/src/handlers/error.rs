use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::error::{GateDenial, TutorError};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Locked(GateDenial),
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

impl From<TutorError> for ApiError {
    fn from(err: TutorError) -> Self {
        match err {
            TutorError::Validation(message) => ApiError::BadRequest(message),
            TutorError::Unauthorized(message) => ApiError::Unauthorized(message),
            TutorError::Locked(denial) => ApiError::Locked(denial),
            TutorError::NotFound(message) => ApiError::NotFound(message),
            unavailable @ TutorError::Unavailable => ApiError::Unavailable(unavailable.to_string()),
            TutorError::Internal(err) => ApiError::from(err),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(format!("{:#}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Locked(denial) => {
                let body = json!({
                    "detail": {
                        "error": denial.reason.as_str(),
                        "message": denial.message,
                        "locked": true,
                    }
                });
                return (StatusCode::FORBIDDEN, Json(body)).into_response();
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Unavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
            ApiError::Internal(message) => {
                tracing::error!("Request failed: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(json!({ "detail": message }))).into_response()
    }
}
