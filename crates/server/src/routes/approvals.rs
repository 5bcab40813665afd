// crates/server/src/routes/approvals.rs
//! Approval (asset) endpoints.
//!
//! - `GET    /api/approvals`
//! - `POST   /api/approvals`               -- JSON, file already hosted elsewhere
//! - `POST   /api/approvals/upload`        -- multipart: store the file, then create the row
//! - `GET    /api/approvals/{id}`
//! - `PATCH  /api/approvals/{id}`
//! - `POST   /api/approvals/{id}/status`   -- reviewer decision with optional comment
//! - `DELETE /api/approvals/{id}`
//! - `GET    /api/projects/{id}/approvals`
//! - `GET    /api/clients/{id}/approvals`

use std::sync::Arc;

use agencydesk_core::asset_kind_for;
use agencydesk_db::{Approval, ApprovalDecision, ApprovalPatch, NewApproval, OrEmpty};
use agencydesk_types::{AssetKind, Bucket};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::storage::{store, UploadForm};
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/approvals", get(list_approvals).post(create_approval))
        .route("/approvals/upload", post(upload_approval))
        .route(
            "/approvals/{id}",
            get(get_approval).patch(update_approval).delete(delete_approval),
        )
        .route("/approvals/{id}/status", post(set_status))
        .route("/projects/{id}/approvals", get(list_project_approvals))
        .route("/clients/{id}/approvals", get(list_client_approvals))
}

async fn list_approvals(State(state): State<Arc<AppState>>) -> Json<Vec<Approval>> {
    Json(state.db.list_approvals().await.or_empty("approvals"))
}

async fn list_project_approvals(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Json<Vec<Approval>> {
    Json(
        state
            .db
            .list_approvals_for_project(&project_id)
            .await
            .or_empty("project approvals"),
    )
}

async fn list_client_approvals(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> Json<Vec<Approval>> {
    Json(
        state
            .db
            .list_approvals_for_client(&client_id)
            .await
            .or_empty("client approvals"),
    )
}

async fn get_approval(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Approval>> {
    Ok(Json(state.db.get_approval(&id).await?))
}

async fn create_approval(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<NewApproval>,
) -> ApiResult<(StatusCode, Json<Approval>)> {
    let approval = state.db.create_approval(input).await?;
    Ok((StatusCode::CREATED, Json(approval)))
}

/// POST /api/approvals/upload
///
/// Fields: `file`, `clientId`, `title`, optional `projectId`,
/// `description` and `requiresSignOff` (`true`/`false`). The file goes to
/// the `project-assets` bucket first. If the row cannot be created the
/// stored object is deleted again.
async fn upload_approval(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Approval>)> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;
    let client_id = form
        .field("clientId")
        .ok_or_else(|| ApiError::BadRequest("clientId is required".into()))?;
    let title = form
        .field("title")
        .unwrap_or_else(|| file.file_name.clone());
    let requires_sign_off = match form.field("requiresSignOff").as_deref() {
        None | Some("false") | Some("0") => false,
        Some("true") | Some("1") => true,
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "requiresSignOff must be true or false, got '{other}'"
            )))
        }
    };

    let stored = store(&state, Bucket::ProjectAssets, &file).await?;
    let kind = asset_kind_for(&stored.content_type);
    let input = NewApproval {
        client_id,
        project_id: form.field("projectId"),
        title,
        description: form.field("description"),
        kind: Some(kind),
        file_url: Some(stored.url.clone()),
        thumbnail_url: (kind == AssetKind::Image).then(|| stored.url.clone()),
        requires_sign_off,
    };

    match state.db.create_approval(input).await {
        Ok(approval) => Ok((StatusCode::CREATED, Json(approval))),
        Err(e) => {
            if let Err(cleanup) = state.storage.remove(Bucket::ProjectAssets, &stored.key).await {
                tracing::warn!(
                    key = %stored.key,
                    error = %cleanup,
                    "Failed to remove upload after approval insert failed"
                );
            }
            Err(e.into())
        }
    }
}

async fn update_approval(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ApprovalPatch>,
) -> ApiResult<Json<Approval>> {
    Ok(Json(state.db.update_approval(&id, patch).await?))
}

async fn set_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(decision): ApiJson<ApprovalDecision>,
) -> ApiResult<Json<Approval>> {
    Ok(Json(state.db.set_approval_status(&id, decision).await?))
}

async fn delete_approval(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_approval(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
