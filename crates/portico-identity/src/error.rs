//! Error types for credential storage and identity-platform access.

use thiserror::Error;

/// Errors produced below the HTTP surface.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Project identifier is missing or contains unsafe characters.
    #[error("Invalid project id: {0}")]
    InvalidProjectId(String),

    /// Credential document failed validation.
    #[error("Invalid credential document: {0}")]
    InvalidCredential(String),

    /// No credential file stored for the requested project.
    #[error("No service account credentials found for project '{0}'")]
    CredentialsNotFound(String),

    /// Filesystem failure while reading or writing a credential file.
    #[error("Credential storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Token endpoint rejected the assertion or returned garbage.
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// Failed to sign the service-account JWT assertion.
    #[error("Failed to sign token assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// Outbound HTTP failure.
    #[error("Identity platform request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Identity platform returned a non-success status.
    #[error("Identity platform returned {status}: {message}")]
    Platform { status: u16, message: String },
}

pub type IdentityResult<T> = Result<T, IdentityError>;
