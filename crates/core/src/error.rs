// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Input rejected before it reaches the database or the object store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("message must have text or at least one attachment")]
    EmptyMessage,

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(i64),

    #[error("{field} must not be negative")]
    NegativeAmount { field: &'static str },

    #[error("a conversation needs at least two participants")]
    TooFewParticipants,

    #[error("invalid date '{value}' for {field} (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },

    #[error("invalid file name '{0}'")]
    InvalidFileName(String),
}

impl ValidationError {
    pub fn empty(field: &'static str) -> Self {
        Self::EmptyField { field }
    }
}

/// Errors from the object store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("object not found: {path}")]
    NotFound { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Require a non-blank string, returning it trimmed.
pub fn require_text<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::empty(field))
    } else {
        Ok(trimmed)
    }
}

/// Validate an optional `YYYY-MM-DD` calendar date.
pub fn validate_date(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(v) if chrono::NaiveDate::parse_from_str(v, "%Y-%m-%d").is_err() => {
            Err(ValidationError::InvalidDate {
                field,
                value: v.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Project progress is a percentage.
pub fn validate_progress(progress: i64) -> Result<(), ValidationError> {
    if (0..=100).contains(&progress) {
        Ok(())
    } else {
        Err(ValidationError::ProgressOutOfRange(progress))
    }
}

pub fn validate_amount(field: &'static str, amount: f64) -> Result<(), ValidationError> {
    if amount < 0.0 || amount.is_nan() {
        Err(ValidationError::NegativeAmount { field })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text_trims() {
        assert_eq!(require_text("name", "  Acme ").unwrap(), "Acme");
        assert_eq!(
            require_text("name", "   ").unwrap_err(),
            ValidationError::EmptyField { field: "name" }
        );
    }

    #[test]
    fn test_validate_date() {
        assert!(validate_date("due_date", None).is_ok());
        assert!(validate_date("due_date", Some("2026-03-01")).is_ok());
        let err = validate_date("due_date", Some("03/01/2026")).unwrap_err();
        assert!(err.to_string().contains("due_date"));
    }

    #[test]
    fn test_validate_progress_bounds() {
        assert!(validate_progress(0).is_ok());
        assert!(validate_progress(100).is_ok());
        assert_eq!(
            validate_progress(101),
            Err(ValidationError::ProgressOutOfRange(101))
        );
        assert!(validate_progress(-1).is_err());
    }

    #[test]
    fn test_storage_io_not_found_maps() {
        let err = StorageError::io(
            "/tmp/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, StorageError::NotFound { .. }));
    }
}
