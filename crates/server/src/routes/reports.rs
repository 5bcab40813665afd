// crates/server/src/routes/reports.rs
use std::sync::Arc;

use agencydesk_db::{NewReport, OrEmpty, Report};
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
        .route("/reports", get(list_reports).post(create_report))
        .route("/reports/{id}", get(get_report).delete(delete_report))
        .route("/clients/{id}/reports", get(list_client_reports))
}

async fn list_reports(State(state): State<Arc<AppState>>) -> Json<Vec<Report>> {
    Json(state.db.list_reports().await.or_empty("reports"))
}

async fn list_client_reports(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> Json<Vec<Report>> {
    Json(
        state
            .db
            .list_reports_for_client(&client_id)
            .await
            .or_empty("client reports"),
    )
}

async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Report>> {
    Ok(Json(state.db.get_report(&id).await?))
}

async fn create_report(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<NewReport>,
) -> ApiResult<(StatusCode, Json<Report>)> {
    let report = state.db.create_report(input).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn delete_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_report(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
