// crates/server/src/routes/clients.rs
//! Client endpoints. Per-client sub-lists live with their own resources.

use std::sync::Arc;

use agencydesk_db::{Client, ClientPatch, NewClient, OrEmpty};
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
        .route("/clients", get(list_clients).post(create_client))
        .route(
            "/clients/{id}",
            get(get_client).patch(update_client).delete(delete_client),
        )
}

async fn list_clients(State(state): State<Arc<AppState>>) -> Json<Vec<Client>> {
    Json(state.db.list_clients().await.or_empty("clients"))
}

async fn get_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Client>> {
    Ok(Json(state.db.get_client(&id).await?))
}

async fn create_client(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<NewClient>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    let client = state.db.create_client(input).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

async fn update_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ClientPatch>,
) -> ApiResult<Json<Client>> {
    Ok(Json(state.db.update_client(&id, patch).await?))
}

/// Cascades to the client's projects, tasks, invoices, approvals and reports.
async fn delete_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_client(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
