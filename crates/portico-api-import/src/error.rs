//! API error taxonomy.
//!
//! Validation failures map to 400, a missing credential file to 404, and
//! everything else (parse errors, client construction, platform failures,
//! filesystem errors) to 500. All error responses share one JSON shape:
//! `{"error": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use portico_identity::IdentityError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message. No structured error codes.
    pub error: String,
}

/// Import API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required multipart field is absent.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Uploaded file has the wrong content type or extension.
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    /// Upload exceeds the size limit for its endpoint.
    #[error("File too large: {0}")]
    FileTooLarge(String),

    /// Multipart body could not be read.
    #[error("Invalid multipart upload: {0}")]
    Multipart(String),

    /// Project identifier failed validation.
    #[error("Invalid project id: {0}")]
    InvalidProjectId(String),

    /// No credential file stored for the requested project.
    #[error("No service account credentials found for project '{0}'")]
    CredentialsNotFound(String),

    /// CSV could not be decoded into import rows.
    #[error("Failed to parse CSV: {0}")]
    InvalidCsv(String),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingField(_)
            | ApiError::InvalidFileType(_)
            | ApiError::FileTooLarge(_)
            | ApiError::Multipart(_)
            | ApiError::InvalidProjectId(_) => StatusCode::BAD_REQUEST,
            ApiError::CredentialsNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidCsv(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::CredentialsNotFound(project) => ApiError::CredentialsNotFound(project),
            IdentityError::InvalidProjectId(msg) => ApiError::InvalidProjectId(msg),
            IdentityError::InvalidCredential(msg) => ApiError::InvalidFileType(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(format!("I/O error: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
