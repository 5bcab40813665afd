// crates/server/src/routes/dashboard.rs
use std::sync::Arc;

use agencydesk_db::{AdminOverview, ClientOverview};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard/admin", get(admin_overview))
        .route("/clients/{id}/overview", get(client_overview))
}

async fn admin_overview(State(state): State<Arc<AppState>>) -> ApiResult<Json<AdminOverview>> {
    Ok(Json(state.db.admin_overview().await?))
}

/// Portal home for one client.
async fn client_overview(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> ApiResult<Json<ClientOverview>> {
    Ok(Json(state.db.client_overview(&client_id).await?))
}
