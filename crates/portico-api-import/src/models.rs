//! API response models.

use portico_identity::RowFailure;
use serde::{Deserialize, Serialize};

/// Response body for `POST /api/store-service-account`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreCredentialsResponse {
    pub success: bool,
    pub message: String,
    pub body: StoredCredential,
}

/// Where the credential document was stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    pub project_id: String,
    pub path: String,
}

/// Submission state of one batch within an import request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Accepted by the platform; per-row errors may still be present.
    Submitted,
    /// The batch call itself failed; no rows from it were committed.
    Failed,
    /// Never submitted because an earlier batch failed hard.
    NotAttempted,
}

/// Per-batch report entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReportEntry {
    /// 1-based batch index (row-offset / 1000 + 1).
    pub batch: usize,
    pub status: BatchStatus,
    /// Rows accepted by the platform.
    pub success: usize,
    /// Rows rejected by the platform.
    pub failed: usize,
    /// Per-row rejections from the platform.
    pub errors: Vec<RowFailure>,
    /// Request-level failure message, for `failed` batches only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response body for `POST /api/import-users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportUsersResponse {
    /// True when every batch was submitted.
    pub success: bool,
    /// Total rows parsed from the CSV.
    #[serde(rename = "totalImported")]
    pub total_imported: usize,
    /// One entry per planned batch, in submission order.
    pub report: Vec<ImportReportEntry>,
}
