use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};

use crate::handlers::error::ApiError;

/// `Json<T>` whose rejections come back as `{"detail": ...}` with status 400.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| AppJson(value))
            .map_err(reject)
    }
}

fn reject(rejection: JsonRejection) -> ApiError {
    tracing::warn!(status = %rejection.status(), "Rejected request body: {}", rejection.body_text());
    ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
}
