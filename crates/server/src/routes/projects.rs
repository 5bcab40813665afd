// crates/server/src/routes/projects.rs
use std::sync::Arc;

use agencydesk_db::{NewProject, OrEmpty, Project, ProjectPatch};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/clients/{id}/projects", get(list_client_projects))
}

async fn list_projects(State(state): State<Arc<AppState>>) -> Json<Vec<Project>> {
    Json(state.db.list_projects().await.or_empty("projects"))
}

async fn list_client_projects(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> Json<Vec<Project>> {
    Json(
        state
            .db
            .list_projects_for_client(&client_id)
            .await
            .or_empty("client projects"),
    )
}

async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.db.get_project(&id).await?))
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<NewProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = state.db.create_project(input).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ProjectPatch>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.db.update_project(&id, patch).await?))
}

async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_project(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
