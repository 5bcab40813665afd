// crates/server/src/routes/leads.rs
//! Lead endpoints and lead-to-client conversion.

use std::sync::Arc;

use agencydesk_db::{Lead, LeadConversion, LeadPatch, NewLead, OrEmpty};
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
        .route("/leads", get(list_leads).post(create_lead))
        .route(
            "/leads/{id}",
            get(get_lead).patch(update_lead).delete(delete_lead),
        )
        .route("/leads/{id}/convert", post(convert_lead))
}

async fn list_leads(State(state): State<Arc<AppState>>) -> Json<Vec<Lead>> {
    Json(state.db.list_leads().await.or_empty("leads"))
}

async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Lead>> {
    Ok(Json(state.db.get_lead(&id).await?))
}

async fn create_lead(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<NewLead>,
) -> ApiResult<(StatusCode, Json<Lead>)> {
    let lead = state.db.create_lead(input).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

async fn update_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<LeadPatch>,
) -> ApiResult<Json<Lead>> {
    Ok(Json(state.db.update_lead(&id, patch).await?))
}

async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_lead(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/leads/{id}/convert -- 201 with the new client and the closed
/// lead, 409 when the lead was already converted.
async fn convert_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<LeadConversion>)> {
    let conversion = state.db.convert_lead_to_client(&id).await?;
    Ok((StatusCode::CREATED, Json(conversion)))
}
