//! Bulk import orchestration.
//!
//! Sequencing per request: resolve credentials, resolve or create the
//! session, stage the upload, buffer-parse the CSV, partition into batches
//! of at most 1000 rows, submit each batch in order, aggregate the report.

use std::path::Path;

use portico_identity::{ImportUser, PasswordHashConfig, SessionRegistry};

use crate::error::ApiError;
use crate::models::{BatchStatus, ImportReportEntry, ImportUsersResponse};
use crate::services::csv_parser;
use crate::services::staging::StagedUpload;

/// Maximum rows per submitted batch.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Run one import request end to end.
///
/// The staged copy of the upload is removed on every exit path. A hard
/// failure on one batch stops submission; the report marks that batch
/// `failed` and every later batch `not_attempted`.
pub async fn import_users(
    registry: &SessionRegistry,
    uploads_dir: &Path,
    project_id: &str,
    file_name: &str,
    content: &[u8],
    hash: &PasswordHashConfig,
) -> Result<ImportUsersResponse, ApiError> {
    // Credentials must exist before any parsing happens.
    if !registry.store().exists(project_id).await? {
        return Err(ApiError::CredentialsNotFound(project_id.to_string()));
    }

    let client = registry.get_or_create(project_id).await.map_err(|e| {
        // Session construction failures on the import path are internal;
        // the credential document was accepted at upload time.
        match ApiError::from(e) {
            err @ ApiError::CredentialsNotFound(_) => err,
            err => ApiError::Internal(err.to_string()),
        }
    })?;

    // Guard removes the staged file when this function returns, on both
    // the success and the failure path.
    let staged = StagedUpload::write(uploads_dir, file_name, content).await?;
    let data = staged.read().await?;

    // Fully buffered: parsing completes before any batch is submitted.
    let rows = csv_parser::parse_csv(&data).map_err(ApiError::InvalidCsv)?;
    let total_rows = rows.len();

    tracing::info!(
        project_id = project_id,
        rows = total_rows,
        batches = total_rows.div_ceil(MAX_BATCH_SIZE),
        "Starting bulk import"
    );

    let mut report = Vec::new();
    let mut aborted = false;

    for (offset, batch) in batch_offsets(&rows) {
        let index = offset / MAX_BATCH_SIZE + 1;

        if aborted {
            report.push(ImportReportEntry {
                batch: index,
                status: BatchStatus::NotAttempted,
                success: 0,
                failed: 0,
                errors: Vec::new(),
                error: None,
            });
            continue;
        }

        match client.import_users(batch, hash).await {
            Ok(outcome) => {
                tracing::info!(
                    project_id = project_id,
                    batch = index,
                    success = outcome.success_count,
                    failed = outcome.failure_count,
                    "Batch submitted"
                );
                report.push(ImportReportEntry {
                    batch: index,
                    status: BatchStatus::Submitted,
                    success: outcome.success_count,
                    failed: outcome.failure_count,
                    errors: outcome.errors,
                    error: None,
                });
            }
            Err(e) => {
                tracing::error!(
                    project_id = project_id,
                    batch = index,
                    error = %e,
                    "Batch submission failed, skipping remaining batches"
                );
                report.push(ImportReportEntry {
                    batch: index,
                    status: BatchStatus::Failed,
                    success: 0,
                    failed: 0,
                    errors: Vec::new(),
                    error: Some(e.to_string()),
                });
                aborted = true;
            }
        }
    }

    Ok(ImportUsersResponse {
        success: !aborted,
        total_imported: total_rows,
        report,
    })
}

/// Consecutive batches of at most [`MAX_BATCH_SIZE`] rows, with their row
/// offsets, preserving original order.
fn batch_offsets(rows: &[ImportUser]) -> impl Iterator<Item = (usize, &[ImportUser])> {
    rows.chunks(MAX_BATCH_SIZE)
        .enumerate()
        .map(|(i, chunk)| (i * MAX_BATCH_SIZE, chunk))
}
