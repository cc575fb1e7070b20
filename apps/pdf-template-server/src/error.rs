//! Error types for the PDF template server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::pdf::PdfError;
use crate::storage::StorageError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Message returned for every failure the client cannot act on
const GENERIC_FAILURE: &str = "Failed to process PDF";

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// A required field or file was absent
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Bytes could not be parsed as a PDF
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Download requested with nothing staged under that id
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// `filePath` names no stored template
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Any other parsing, rendering or storage failure
    #[error("Processing failure: {0}")]
    ProcessingFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PdfError> for AppError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::MalformedDocument(msg) => AppError::MalformedDocument(msg),
            other => AppError::ProcessingFailure(other.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ArtifactNotFound(name) => AppError::ArtifactNotFound(name),
            StorageError::TemplateNotFound(path) => AppError::TemplateNotFound(path),
            StorageError::InvalidId(id) => AppError::MissingInput(format!("Invalid id: {}", id)),
            StorageError::Io(e) => AppError::Io(e),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::ProcessingFailure(format!("Worker task failed: {}", err))
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::MissingInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ArtifactNotFound(_) => (
                StatusCode::NOT_FOUND,
                "Nothing to download: the file was already served or never generated".to_string(),
            ),
            AppError::TemplateNotFound(_) => {
                (StatusCode::NOT_FOUND, "Template not found".to_string())
            }
            AppError::MalformedDocument(e) => {
                tracing::error!("Malformed document: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE.to_string())
            }
            AppError::ProcessingFailure(e) => {
                tracing::error!("Processing failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE.to_string())
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE.to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::MissingInput("x".into()), StatusCode::BAD_REQUEST),
            (AppError::ArtifactNotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::TemplateNotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::MalformedDocument("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::ProcessingFailure("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_pdf_error_conversion() {
        let err: AppError = PdfError::MalformedDocument("bad".into()).into();
        assert!(matches!(err, AppError::MalformedDocument(_)));

        let err: AppError = PdfError::NoPages.into();
        assert!(matches!(err, AppError::ProcessingFailure(_)));
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: AppError = StorageError::ArtifactNotFound("a".into()).into();
        assert!(matches!(err, AppError::ArtifactNotFound(_)));

        let err: AppError = StorageError::InvalidId("zzz".into()).into();
        assert!(matches!(err, AppError::MissingInput(_)));
    }
}
