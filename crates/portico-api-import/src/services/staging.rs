//! Staged upload files with guaranteed cleanup.
//!
//! Uploaded CSVs are written under the uploads directory with a timestamp
//! prefix, and removed again on every exit path: the guard deletes the file
//! when dropped, whether the import succeeded or failed.

use std::path::{Path, PathBuf};

use crate::error::ApiError;

/// Maximum staged filename length (bytes).
const MAX_FILENAME_LENGTH: usize = 255;

/// A staged upload on disk. Dropping the guard removes the file.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
}

impl StagedUpload {
    /// Write `content` to the uploads directory under a timestamp-prefixed,
    /// sanitized name.
    pub async fn write(
        uploads_dir: &Path,
        original_name: &str,
        content: &[u8],
    ) -> Result<Self, ApiError> {
        tokio::fs::create_dir_all(uploads_dir).await?;

        let name = format!(
            "{}-{}",
            chrono::Utc::now().timestamp_millis(),
            sanitize_filename(original_name)
        );
        let path = uploads_dir.join(name);
        tokio::fs::write(&path, content).await?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "Staged upload");
        Ok(Self { path })
    }

    /// Path of the staged file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the staged file back.
    pub async fn read(&self) -> Result<Vec<u8>, ApiError> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Removed staged upload");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged upload");
            }
        }
    }
}

/// SECURITY: strip path components and unsafe characters from an uploaded
/// filename so it cannot escape the uploads directory.
pub fn sanitize_filename(raw_filename: &str) -> String {
    let filename = raw_filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw_filename);

    let sanitized: String = filename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
        .collect();

    // No hidden files, no consecutive periods
    let sanitized = sanitized.trim_start_matches('.');
    let sanitized: String = sanitized.chars().fold(String::new(), |mut acc, c| {
        if !(c == '.' && acc.ends_with('.')) {
            acc.push(c);
        }
        acc
    });

    let result = if sanitized.len() > MAX_FILENAME_LENGTH {
        sanitized[..MAX_FILENAME_LENGTH].to_string()
    } else {
        sanitized
    };

    if result.is_empty() || result == "csv" || result == ".csv" {
        "upload.csv".to_string()
    } else {
        result
    }
}
