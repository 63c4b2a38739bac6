//! Bulk import handler.
//!
//! `POST /api/import-users` — multipart form with a `csv_file` part
//! (filename must end in `.csv`, at most 10 MiB) and a `target_project_id`
//! field. Optional `hash_algorithm` and `signer_key` (base64) fields
//! override the configured password-hash defaults for this request.

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::ApiError;
use crate::models::ImportUsersResponse;
use crate::router::ImportApiState;
use crate::services::csv_parser::MAX_CSV_SIZE;
use crate::services::import_service;

/// POST /api/import-users
pub async fn import_users(
    State(state): State<ImportApiState>,
    mut multipart: Multipart,
) -> Result<Json<ImportUsersResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut project_id: Option<String> = None;
    let mut hash = state.default_hash.clone();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Multipart(e.to_string()))?
    {
        match field.name().unwrap_or("") {
            "csv_file" => {
                let name = field.file_name().unwrap_or("").to_string();
                if !name.to_lowercase().ends_with(".csv") {
                    return Err(ApiError::InvalidFileType(
                        "csv_file must have a .csv extension".to_string(),
                    ));
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Multipart(format!("Failed to read file: {e}")))?;
                if bytes.len() > MAX_CSV_SIZE {
                    return Err(ApiError::FileTooLarge(format!(
                        "csv_file is {} bytes, maximum is {} bytes",
                        bytes.len(),
                        MAX_CSV_SIZE
                    )));
                }
                file_name = Some(name);
                file_data = Some(bytes.to_vec());
            }
            "target_project_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Multipart(format!("Failed to read field: {e}")))?;
                project_id = Some(text);
            }
            "hash_algorithm" => {
                hash.algorithm = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Multipart(format!("Failed to read field: {e}")))?;
            }
            "signer_key" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Multipart(format!("Failed to read field: {e}")))?;
                hash.signer_key = STANDARD.decode(text.trim()).map_err(|e| {
                    ApiError::Multipart(format!("signer_key is not valid base64: {e}"))
                })?;
            }
            _ => {} // Ignore unknown fields
        }
    }

    let data = file_data.ok_or(ApiError::MissingField("csv_file"))?;
    let file_name = file_name.unwrap_or_else(|| "upload.csv".to_string());
    let project_id = project_id
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::MissingField("target_project_id"))?;

    let response = import_service::import_users(
        &state.registry,
        &state.uploads_dir,
        &project_id,
        &file_name,
        &data,
        &hash,
    )
    .await?;

    Ok(Json(response))
}
