use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::Config;
pub use services::AppState;

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if config.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = cors_layer(&app_state.config);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .route("/api", get(handlers::root))
        .route("/api/", get(handlers::root))
        .nest("/api/auth", auth_routes())
        .nest("/api/problems", problem_routes())
        .nest("/api/students", student_routes())
        .route("/api/updateProgress", post(handlers::students::update_progress))
        .nest("/api/teacher", teacher_routes())
        .nest("/api/admin", admin_routes())
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/student-login", post(handlers::auth::student_login))
        .route("/teacher-login", post(handlers::auth::teacher_login))
        .route("/logout", post(handlers::auth::logout))
}

fn problem_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/section/{section_id}",
            get(handlers::problems::list_section_problems),
        )
        .route("/{problem_id}", get(handlers::problems::get_problem))
}

fn student_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{username}/progress", get(handlers::students::get_progress))
        .route("/{username}/attempt", post(handlers::students::submit_attempt))
}

fn teacher_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/students", get(handlers::teacher::list_students))
        .route("/dashboard", get(handlers::teacher::dashboard))
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/clear-all-data", delete(handlers::admin::clear_all_data))
        .route("/clear-test-data", post(handlers::admin::clear_test_data))
        .route("/stats", get(handlers::admin::stats))
        .route("/reset-db", post(handlers::admin::reset_db))
}
