// crates/server/src/routes/profiles.rs
//! Profile endpoints.
//!
//! - `GET    /api/profiles`
//! - `POST   /api/profiles`
//! - `GET    /api/profiles/{id}`
//! - `PATCH  /api/profiles/{id}`
//! - `PUT    /api/profiles/{id}/role`
//! - `DELETE /api/profiles/{id}`
//! - `GET    /api/profiles/{id}/client`  -- the client record linked to this login

use std::sync::Arc;

use agencydesk_db::{Client, NewProfile, OrEmpty, Profile, ProfilePatch};
use agencydesk_types::Role;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profiles", get(list_profiles).post(create_profile))
        .route(
            "/profiles/{id}",
            get(get_profile).patch(update_profile).delete(delete_profile),
        )
        .route("/profiles/{id}/role", put(set_role))
        .route("/profiles/{id}/client", get(get_linked_client))
}

async fn list_profiles(State(state): State<Arc<AppState>>) -> Json<Vec<Profile>> {
    Json(state.db.list_profiles().await.or_empty("profiles"))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Profile>> {
    Ok(Json(state.db.get_profile(&id).await?))
}

async fn create_profile(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<NewProfile>,
) -> ApiResult<(StatusCode, Json<Profile>)> {
    let profile = state.db.create_profile(input).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> ApiResult<Json<Profile>> {
    Ok(Json(state.db.update_profile(&id, patch).await?))
}

/// The role arrives as a plain string so an unknown value is reported with
/// the list of valid roles.
#[derive(Debug, Deserialize)]
struct RoleChange {
    role: String,
}

async fn set_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<RoleChange>,
) -> ApiResult<Json<Profile>> {
    let role: Role = body.role.trim().parse()?;
    Ok(Json(state.db.set_profile_role(&id, role).await?))
}

async fn delete_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_profile(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_linked_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Client>> {
    Ok(Json(state.db.get_client_for_user(&id).await?))
}
