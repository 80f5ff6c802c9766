#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use inequalities_tutor_api::{
    config::Config,
    create_router,
    services::AppState,
    store::{CourseStore, MemoryStore},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(Config::default()).await
}

pub async fn create_test_app_with(config: Config) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store = Arc::new(MemoryStore::new());
    let course_store: Arc<dyn CourseStore> = store.clone();
    let app_state = Arc::new(
        AppState::new(config, course_store)
            .await
            .expect("Failed to initialize test app state"),
    );

    TestApp {
        router: create_router(app_state),
        store,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(body)).await
    }

    pub async fn login(&self, username: &str, class_name: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/auth/student-login",
                serde_json::json!({ "username": username, "class_name": class_name }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body
    }

    pub async fn attempt(
        &self,
        username: &str,
        problem_id: &str,
        answer: &str,
        hints_used: u32,
    ) -> (StatusCode, Value) {
        self.post(
            &format!("/api/students/{}/attempt", username),
            serde_json::json!({
                "problem_id": problem_id,
                "answer": answer,
                "hints_used": hints_used,
            }),
        )
        .await
    }
}

pub fn unique_username(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..8])
}
