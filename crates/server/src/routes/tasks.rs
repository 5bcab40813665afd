// crates/server/src/routes/tasks.rs
//! Task endpoints, including the status cycle used by the task board.

use std::sync::Arc;

use agencydesk_db::{NewTask, OrEmpty, Task, TaskPatch};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/cycle", post(cycle_task))
        .route("/projects/{id}/tasks", get(list_project_tasks))
}

async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<Task>> {
    Json(state.db.list_tasks().await.or_empty("tasks"))
}

async fn list_project_tasks(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Json<Vec<Task>> {
    Json(
        state
            .db
            .list_tasks_for_project(&project_id)
            .await
            .or_empty("project tasks"),
    )
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.db.get_task(&id).await?))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<NewTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = state.db.create_task(input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.db.update_task(&id, patch).await?))
}

/// POST /api/tasks/{id}/cycle -- todo, in-progress, done, then back to todo.
async fn cycle_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.db.cycle_task_status(&id).await?))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_task(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
