// crates/core/src/storage.rs
//! Object storage for uploaded files.
//!
//! Files live in named buckets and are addressed by a flat object key of
//! the form `<unix-millis>-<sanitized file name>`. Every stored object has
//! a public URL under `<public base>/storage/<bucket>/<key>`.

use std::path::{Path, PathBuf};

use agencydesk_types::{AssetKind, Bucket};
use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use ts_rs::TS;

use crate::error::{StorageError, ValidationError};

/// Longest file-name part kept in an object key.
const MAX_NAME_LEN: usize = 120;

/// Metadata returned for a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub bucket: Bucket,
    pub key: String,
    pub url: String,
    #[ts(type = "number")]
    pub size: u64,
    pub content_type: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under a fresh key derived from `file_name`.
    async fn put(
        &self,
        bucket: Bucket,
        file_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredObject, StorageError>;

    /// Delete an object. Missing objects are reported as `NotFound`.
    async fn remove(&self, bucket: Bucket, key: &str) -> Result<(), StorageError>;

    fn public_url(&self, bucket: Bucket, key: &str) -> String;
}

/// Filesystem-backed store: `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: Bucket) -> PathBuf {
        self.root.join(bucket.as_str())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        bucket: Bucket,
        file_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredObject, StorageError> {
        let dir = self.bucket_dir(bucket);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io(&dir, e))?;

        let base_key = object_key(file_name, chrono::Utc::now().timestamp_millis())?;
        let mut key = base_key.clone();
        let mut attempt = 1;
        let (path, file) = loop {
            let path = dir.join(&key);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempt < 100 => {
                    attempt += 1;
                    key = format!("{attempt}-{base_key}");
                }
                Err(e) => return Err(StorageError::io(&path, e)),
            }
        };

        write_object(&path, file, bytes).await?;

        tracing::debug!(bucket = %bucket, key = %key, size = bytes.len(), "Stored object");

        let content_type = content_type
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| guess_content_type(file_name))
            .to_string();
        Ok(StoredObject {
            bucket,
            url: self.public_url(bucket, &key),
            key,
            size: bytes.len() as u64,
            content_type,
        })
    }

    async fn remove(&self, bucket: Bucket, key: &str) -> Result<(), StorageError> {
        if !is_valid_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        let path = self.bucket_dir(bucket).join(key);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::io(&path, e))?;
        tracing::debug!(bucket = %bucket, key = %key, "Removed object");
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        format!("{}/storage/{}/{}", self.public_base, bucket, key)
    }
}

/// Write the body of a freshly created object. On failure the partial file
/// is removed, since the caller never learns its key.
async fn write_object<W>(path: &Path, mut file: W, bytes: &[u8]) -> Result<(), StorageError>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        file.write_all(bytes).await?;
        file.flush().await
    }
    .await;
    let Err(e) = written else {
        return Ok(());
    };
    drop(file);
    if let Err(cleanup) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove partial object");
    }
    Err(StorageError::io(path, e))
}

/// Build an object key from an uploaded file name.
///
/// Directory components are dropped, and anything outside
/// `[A-Za-z0-9._-]` becomes `-`.
pub fn object_key(file_name: &str, unix_millis: i64) -> Result<String, ValidationError> {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();
    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    let sanitized = sanitized.trim_start_matches('.');
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '-') {
        return Err(ValidationError::InvalidFileName(file_name.to_string()));
    }
    Ok(format!("{unix_millis}-{sanitized}"))
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// Content type from the file extension, for uploads that don't send one.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Asset kind implied by a content type.
pub fn asset_kind_for(content_type: &str) -> AssetKind {
    if content_type.starts_with("image/") {
        AssetKind::Image
    } else if content_type.starts_with("video/") {
        AssetKind::Video
    } else if content_type.starts_with("text/") {
        AssetKind::Copy
    } else if content_type == "application/pdf"
        || content_type == "application/msword"
        || content_type.contains("document")
    {
        AssetKind::Document
    } else {
        AssetKind::Other
    }
}
