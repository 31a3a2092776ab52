use std::sync::Arc;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{handler::*, AppState};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = cors_layer(&app_state.config.allowed_origins);

    Router::new()
        .route("/", get(health_checker_handler))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/tasks", get(get_tasks).post(create_task))
        .route(
            "/api/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/tasks/:id/status", patch(update_task_status))
        .route("/api/stats", get(get_stats))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// Configure CORS settings for the application
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            // Credentialed requests cannot use a wildcard origin
            Ok(value) if value != "*" => Some(value),
            _ => {
                tracing::warn!(origin, "ignoring unusable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_credentials(true)
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}
