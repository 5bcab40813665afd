// crates/server/src/routes/storage.rs
//! Object uploads.
//!
//! - `POST   /api/storage/{bucket}`        -- multipart, one `file` field
//! - `DELETE /api/storage/{bucket}/{key}`
//!
//! Stored objects are read back from `/storage/{bucket}/{key}`, served
//! straight from disk outside the `/api` prefix.

use std::collections::HashMap;
use std::sync::Arc;

use agencydesk_core::StoredObject;
use agencydesk_types::Bucket;
use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::metrics::record_upload;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/storage/{bucket}", post(upload))
        .route("/storage/{bucket}/{key}", delete(remove))
}

/// The file part of a multipart upload.
#[derive(Debug)]
pub(crate) struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// A parsed multipart form: the `file` part plus every text field.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    pub fn take_file(&mut self) -> ApiResult<UploadedFile> {
        self.file
            .take()
            .ok_or_else(|| ApiError::BadRequest("multipart field 'file' is required".into()))
    }

    /// A text field, `None` when absent or blank.
    pub fn field(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Store an uploaded file and count its bytes.
pub(crate) async fn store(
    state: &AppState,
    bucket: Bucket,
    file: &UploadedFile,
) -> ApiResult<StoredObject> {
    let stored = state
        .storage
        .put(
            bucket,
            &file.file_name,
            file.content_type.as_deref(),
            &file.bytes,
        )
        .await?;
    record_upload(bucket.as_str(), stored.size);
    tracing::info!(bucket = %bucket, key = %stored.key, size = stored.size, "Upload stored");
    Ok(stored)
}

async fn upload(
    State(state): State<Arc<AppState>>,
    Path(bucket): Path<String>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<StoredObject>)> {
    let bucket: Bucket = bucket.parse()?;
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;
    let stored = store(&state, bucket, &file).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Path((bucket, key)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let bucket: Bucket = bucket.parse()?;
    state.storage.remove(bucket, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}
