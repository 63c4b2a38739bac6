//! File-backed service-account credential store.
//!
//! One credential file per project identifier, named `<project_id>.json`
//! under a fixed directory. Later uploads overwrite earlier ones; there is
//! no in-memory state.

use std::path::{Path, PathBuf};

use crate::error::{IdentityError, IdentityResult};

/// Maximum accepted credential document size (5 MiB).
pub const MAX_CREDENTIAL_SIZE: usize = 5 * 1024 * 1024;

/// Stores one service-account JSON document per project identifier.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a project's credential file lives at.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidProjectId`] when the identifier is
    /// empty or contains characters outside `[A-Za-z0-9._-]` (path
    /// traversal guard).
    pub fn path_for(&self, project_id: &str) -> IdentityResult<PathBuf> {
        validate_project_id(project_id)?;
        Ok(self.dir.join(format!("{project_id}.json")))
    }

    /// Write a credential document, overwriting any existing file.
    ///
    /// The content must be well-formed JSON and at most
    /// [`MAX_CREDENTIAL_SIZE`] bytes.
    pub async fn store(&self, project_id: &str, content: &[u8]) -> IdentityResult<PathBuf> {
        let path = self.path_for(project_id)?;

        if content.is_empty() {
            return Err(IdentityError::InvalidCredential(
                "Credential document is empty".to_string(),
            ));
        }
        if content.len() > MAX_CREDENTIAL_SIZE {
            return Err(IdentityError::InvalidCredential(format!(
                "Credential document is {} bytes, maximum is {} bytes",
                content.len(),
                MAX_CREDENTIAL_SIZE
            )));
        }
        if serde_json::from_slice::<serde_json::Value>(content).is_err() {
            return Err(IdentityError::InvalidCredential(
                "Credential document is not valid JSON".to_string(),
            ));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, content).await?;

        tracing::info!(
            project_id = project_id,
            path = %path.display(),
            bytes = content.len(),
            "Stored service account credentials"
        );

        Ok(path)
    }

    /// Read the credential document for a project.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::CredentialsNotFound`] when no file exists.
    pub async fn load(&self, project_id: &str) -> IdentityResult<Vec<u8>> {
        let path = self.path_for(project_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(IdentityError::CredentialsNotFound(project_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a credential file exists for the project.
    pub async fn exists(&self, project_id: &str) -> IdentityResult<bool> {
        let path = self.path_for(project_id)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }
}

/// Reject empty identifiers and anything that could escape the store
/// directory. Same character policy as uploaded filename sanitization.
fn validate_project_id(project_id: &str) -> IdentityResult<()> {
    if project_id.is_empty() {
        return Err(IdentityError::InvalidProjectId(
            "Project id must not be empty".to_string(),
        ));
    }
    if !project_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(IdentityError::InvalidProjectId(format!(
            "Project id '{project_id}' contains unsupported characters"
        )));
    }
    if project_id.starts_with('.') {
        return Err(IdentityError::InvalidProjectId(
            "Project id must not start with '.'".to_string(),
        ));
    }
    Ok(())
}
