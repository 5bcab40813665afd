// crates/server/src/error.rs
use agencydesk_core::{StorageError, ValidationError};
use agencydesk_db::DbError;
use agencydesk_types::ParseEnumError;
use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Upload error: {0}")]
    Upload(#[from] MultipartError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not allowed: {0}")]
    Forbidden(String),
}

impl From<ParseEnumError> for ApiError {
    fn from(err: ParseEnumError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn not_found(details: String) -> (StatusCode, ErrorResponse) {
    tracing::warn!(details = %details, "Not found");
    (
        StatusCode::NOT_FOUND,
        ErrorResponse::with_details("Not found", details),
    )
}

fn bad_request(details: String) -> (StatusCode, ErrorResponse) {
    tracing::warn!(details = %details, "Bad request");
    (
        StatusCode::BAD_REQUEST,
        ErrorResponse::with_details("Bad request", details),
    )
}

fn forbidden(details: String) -> (StatusCode, ErrorResponse) {
    tracing::warn!(details = %details, "Forbidden");
    (
        StatusCode::FORBIDDEN,
        ErrorResponse::with_details("Forbidden", details),
    )
}

fn internal(what: &str, err: &dyn std::fmt::Display) -> (StatusCode, ErrorResponse) {
    tracing::error!(error = %err, "{what}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorResponse::new("Internal server error"),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::Database(db_err) => match db_err {
                DbError::NotFound { .. } => not_found(db_err.to_string()),
                DbError::Conflict(msg) => {
                    tracing::warn!(message = %msg, "Conflict");
                    (
                        StatusCode::CONFLICT,
                        ErrorResponse::with_details("Conflict", msg.clone()),
                    )
                }
                DbError::Forbidden(msg) => forbidden(msg.clone()),
                DbError::Constraint(msg) => bad_request(msg.clone()),
                DbError::Invalid(err) => bad_request(err.to_string()),
                DbError::Sqlx(_)
                | DbError::NoDataDir
                | DbError::CreateDir(_)
                | DbError::Serde(_) => internal("Database error", db_err),
            },
            ApiError::Storage(storage_err) => match storage_err {
                StorageError::NotFound { .. } => {
                    not_found("object not found".to_string())
                }
                StorageError::InvalidKey(_) | StorageError::Invalid(_) => {
                    bad_request(storage_err.to_string())
                }
                StorageError::Io { .. } => internal("Storage error", storage_err),
            },
            ApiError::Invalid(err) => bad_request(err.to_string()),
            ApiError::Upload(err) => {
                let status = err.status();
                tracing::warn!(status = %status, error = %err, "Upload rejected");
                (
                    status,
                    ErrorResponse::with_details("Upload rejected", err.body_text()),
                )
            }
            ApiError::Internal(msg) => internal("Internal server error", msg),
            ApiError::BadRequest(msg) => bad_request(msg.clone()),
            ApiError::Forbidden(msg) => forbidden(msg.clone()),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// `Json` extractor whose rejections use the API error body.
///
/// Unknown enum values (an invalid role, say) come back as a 400 that
/// lists the accepted values.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::path::PathBuf;

    /// Helper to extract status code and body from a response
    async fn extract_response(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error_response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, error_response)
    }

    #[tokio::test]
    async fn test_not_found_returns_404() {
        let error = ApiError::from(DbError::not_found("client", "abc123"));
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Not found");
        assert!(body.details.unwrap().contains("abc123"));
    }

    #[tokio::test]
    async fn test_conflict_returns_409() {
        let error = ApiError::from(DbError::Conflict("lead already converted".into()));
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.details.as_deref(), Some("lead already converted"));
    }

    #[tokio::test]
    async fn test_constraint_and_validation_return_400() {
        let error = ApiError::from(DbError::Constraint("a required field is missing".into()));
        let (status, _) = extract_response(error.into_response()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error = ApiError::from(DbError::Invalid(ValidationError::EmptyMessage));
        let (status, body) = extract_response(error.into_response()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.details.unwrap().contains("attachment"));
    }

    #[tokio::test]
    async fn test_forbidden_returns_403() {
        let error = ApiError::from(DbError::Forbidden("not a participant".into()));
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.error, "Forbidden");
    }

    #[tokio::test]
    async fn test_invalid_enum_lists_allowed_values() {
        let err = "owner".parse::<agencydesk_types::Role>().unwrap_err();
        let (status, body) = extract_response(ApiError::from(err).into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let details = body.details.unwrap();
        assert!(details.contains("client, admin, staff, influencer"));
    }

    #[tokio::test]
    async fn test_storage_errors() {
        let error = ApiError::from(StorageError::NotFound {
            path: PathBuf::from("/srv/storage/project-assets/1-a.png"),
        });
        let (status, body) = extract_response(error.into_response()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        // Filesystem paths stay on the server.
        assert!(!body.details.unwrap().contains("/srv"));

        let error = ApiError::from(StorageError::InvalidKey("../etc".into()));
        let (status, _) = extract_response(error.into_response()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let error = ApiError::Internal("Something went wrong".to_string());
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        assert!(body.details.is_none());

        let error = ApiError::from(DbError::NoDataDir);
        let (status, body) = extract_response(error.into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.details.is_none());
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse::new("Test error");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"error\":\"Test error\""));
        assert!(!json.contains("details")); // None should be skipped

        let response = ErrorResponse::with_details("Test error", "More info");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"details\":\"More info\""));
    }
}
