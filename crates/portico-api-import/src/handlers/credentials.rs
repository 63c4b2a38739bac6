//! Credential upload handler.
//!
//! `POST /api/store-service-account` — multipart form with a
//! `credentials_file` part (must be JSON, at most 5 MiB) and a `project_id`
//! field. Overwrites any previously stored document for that project and
//! invalidates its cached session.

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use portico_identity::credentials::MAX_CREDENTIAL_SIZE;

use crate::error::ApiError;
use crate::models::{StoreCredentialsResponse, StoredCredential};
use crate::router::ImportApiState;

/// POST /api/store-service-account
pub async fn store_service_account(
    State(state): State<ImportApiState>,
    mut multipart: Multipart,
) -> Result<Json<StoreCredentialsResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut project_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Multipart(e.to_string()))?
    {
        match field.name().unwrap_or("") {
            "credentials_file" => {
                let content_type = field.content_type().unwrap_or("").to_string();
                if !content_type.contains("json") {
                    return Err(ApiError::InvalidFileType(format!(
                        "credentials_file must be JSON, got content type '{content_type}'"
                    )));
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Multipart(format!("Failed to read file: {e}")))?;
                if bytes.len() > MAX_CREDENTIAL_SIZE {
                    return Err(ApiError::FileTooLarge(format!(
                        "credentials_file is {} bytes, maximum is {} bytes",
                        bytes.len(),
                        MAX_CREDENTIAL_SIZE
                    )));
                }
                file_data = Some(bytes.to_vec());
            }
            "project_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Multipart(format!("Failed to read field: {e}")))?;
                project_id = Some(text);
            }
            _ => {} // Ignore unknown fields
        }
    }

    let data = file_data.ok_or(ApiError::MissingField("credentials_file"))?;
    let project_id = project_id
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::MissingField("project_id"))?;

    let path = state.registry.store().store(&project_id, &data).await?;

    // The old client would keep using the previous credentials; drop it so
    // the next import rebuilds from the new document.
    state.registry.invalidate(&project_id).await;

    Ok(Json(StoreCredentialsResponse {
        success: true,
        message: format!("Service account credentials stored for project '{project_id}'"),
        body: StoredCredential {
            project_id,
            path: path.display().to_string(),
        },
    }))
}
