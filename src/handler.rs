use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use serde_json::json;

use crate::{
    error::AppError,
    model::CurrentUser,
    schema::{
        CreateTaskSchema, LoginSchema, RegisterSchema, TaskFilterParams, UpdateStatusSchema,
        UpdateTaskSchema,
    },
    AppState,
};

// Handler for the health checker route
pub async fn health_checker_handler() -> impl IntoResponse {
    const MESSAGE: &str = "Task manager API with Rust, SQLx, SQLite, and Axum";

    Json(json!({
        "success": true,
        "message": MESSAGE
    }))
}

pub async fn register(
    State(data): State<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterSchema>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let user = data
        .auth
        .register(&body.username, &body.email, &body.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered",
            "user": user
        })),
    ))
}

pub async fn login(
    State(data): State<Arc<AppState>>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<LoginSchema>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = data.auth.login(&body.identifier, &body.password).await?;
    let jar = jar.add(data.auth.session_cookie(outcome.token.clone()));

    Ok((
        jar,
        Json(json!({
            "success": true,
            "message": "User logged in",
            "data": outcome.token,
            "isNewUser": outcome.is_new_user
        })),
    ))
}

// Stateless: the token itself stays valid until it expires
pub async fn logout(State(data): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(data.auth.removal_cookie());

    (
        jar,
        Json(json!({
            "success": true,
            "message": "Logged out successfully"
        })),
    )
}

pub async fn me(
    State(data): State<Arc<AppState>>,
    caller: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = data.auth.profile(&caller.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "user": profile
    })))
}

// Handler for listing the caller's tasks with optional filters
pub async fn get_tasks(
    State(data): State<Arc<AppState>>,
    caller: CurrentUser,
    Query(params): Query<TaskFilterParams>,
) -> Result<impl IntoResponse, AppError> {
    let tasks = data.tasks.list(&caller.user_id, &params).await?;

    Ok(Json(json!({
        "success": true,
        "results": tasks.len(),
        "tasks": tasks,
        "message": "Filtered tasks fetched successfully"
    })))
}

pub async fn create_task(
    State(data): State<Arc<AppState>>,
    caller: CurrentUser,
    WithRejection(Json(body), _): WithRejection<Json<CreateTaskSchema>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let task = data.tasks.create(&caller.user_id, body).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "task": task})),
    ))
}

pub async fn get_task(
    Path(id): Path<String>,
    State(data): State<Arc<AppState>>,
    caller: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let task = data.tasks.get(&caller.user_id, &id).await?;

    Ok(Json(json!({"success": true, "task": task})))
}

pub async fn update_task(
    Path(id): Path<String>,
    State(data): State<Arc<AppState>>,
    caller: CurrentUser,
    WithRejection(Json(body), _): WithRejection<Json<UpdateTaskSchema>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let task = data.tasks.update(&caller.user_id, &id, body).await?;

    Ok(Json(json!({"success": true, "task": task})))
}

pub async fn update_task_status(
    Path(id): Path<String>,
    State(data): State<Arc<AppState>>,
    caller: CurrentUser,
    WithRejection(Json(body), _): WithRejection<Json<UpdateStatusSchema>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let task = data
        .tasks
        .set_completion(&caller.user_id, &id, body.completed)
        .await?;

    Ok(Json(json!({"success": true, "task": task})))
}

pub async fn delete_task(
    Path(id): Path<String>,
    State(data): State<Arc<AppState>>,
    caller: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    data.tasks.delete(&caller.user_id, &id).await?;

    Ok(Json(json!({"success": true, "message": "Task deleted"})))
}

pub async fn get_stats(
    State(data): State<Arc<AppState>>,
    caller: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let summary = data.stats.summary(&caller.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "total": summary.total,
        "completed": summary.completed,
        "pending": summary.pending
    })))
}
