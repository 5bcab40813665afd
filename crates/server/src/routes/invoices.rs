// crates/server/src/routes/invoices.rs
use std::sync::Arc;

use agencydesk_db::{Invoice, InvoicePatch, NewInvoice, OrEmpty};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route("/invoices/mark-overdue", post(mark_overdue))
        .route(
            "/invoices/{id}",
            get(get_invoice).patch(update_invoice).delete(delete_invoice),
        )
        .route("/clients/{id}/invoices", get(list_client_invoices))
}

async fn list_invoices(State(state): State<Arc<AppState>>) -> Json<Vec<Invoice>> {
    Json(state.db.list_invoices().await.or_empty("invoices"))
}

async fn list_client_invoices(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> Json<Vec<Invoice>> {
    Json(
        state
            .db
            .list_invoices_for_client(&client_id)
            .await
            .or_empty("client invoices"),
    )
}

async fn get_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.db.get_invoice(&id).await?))
}

async fn create_invoice(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<NewInvoice>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let invoice = state.db.create_invoice(input).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn update_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<InvoicePatch>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.db.update_invoice(&id, patch).await?))
}

async fn delete_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_invoice(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct OverdueQuery {
    /// `YYYY-MM-DD`; defaults to today in UTC.
    today: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
#[serde(rename_all = "camelCase")]
struct OverdueResponse {
    today: String,
    updated: u64,
}

/// POST /api/invoices/mark-overdue -- pending invoices past their due date become overdue.
async fn mark_overdue(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OverdueQuery>,
) -> ApiResult<Json<OverdueResponse>> {
    let today = query
        .today
        .unwrap_or_else(|| chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string());
    let updated = state.db.mark_overdue_invoices(&today).await?;
    Ok(Json(OverdueResponse { today, updated }))
}
